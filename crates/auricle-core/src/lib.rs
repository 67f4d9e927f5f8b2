//! auricle-core - spatial-audio mixing coordinator
//!
//! Sits between a host audio engine and an HRTF DSP engine:
//! - Fixed pool of per-source processing slots shared by all concurrent sources
//! - Per-source effect instances that downmix into slot scratch and translate
//!   host transforms + parameters into the engine's acoustic-parameter record
//! - A shared mixer pass that renders every active slot into the output bus
//! - An object-based backend that decouples a 10 ms render pump from the
//!   host callback cadence via per-source ring buffers

pub mod acoustics;
pub mod error;
pub mod host;
pub mod hrtf;
pub mod objects;
pub mod ring;
pub mod spatializer;
pub mod types;
pub mod vecmath;

pub use error::{SpatialError, SpatialResult};
pub use types::*;
