//! Spatializer error types

use thiserror::Error;

/// Errors that can occur while coordinating the spatial render
#[derive(Error, Debug)]
pub enum SpatialError {
    /// DSP engine could not be constructed; the shared system stays uninitialised
    #[error("engine initialisation failed: {0}")]
    FatalInit(String),

    /// No free slot in the source pool
    #[error("source pool exhausted ({0} slots)")]
    PoolExhausted(usize),

    /// Engine-side per-slot resource allocation failed
    #[error("engine resource allocation failed: {0}")]
    Resource(String),

    /// Operation not supported in the current configuration
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Spatial render stream is not active
    #[error("spatial render stream inactive")]
    Inactive,

    /// Audio interface activation failed
    #[error("device activation failed: {0}")]
    Activation(String),
}

/// Result type for spatializer operations
pub type SpatialResult<T> = Result<T, SpatialError>;
