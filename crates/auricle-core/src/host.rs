//! Abstract host plugin contract
//!
//! The host engine drives every effect instance through a per-tick process
//! call carrying this state. The ABI glue itself (callback registration,
//! marshalling) lives in the host integration layer; these are the values
//! that cross it.

use crate::types::{Matrix4, QUANTUM};

/// Outcome of a process call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessStatus {
    Ok,
    /// Configuration the plugin cannot handle; output untouched
    Unsupported,
}

/// Spatialization payload the host attaches to spatializable sources
#[derive(Clone, Copy, Debug)]
pub struct SpatializerData {
    /// Source local-to-world transform, column-major
    pub source_matrix: Matrix4,
    /// Listener world-to-local transform (pre-inverted by the host)
    pub listener_matrix: Matrix4,
    /// Dry/spatial crossfade in [0, 1]
    pub spatial_blend: f32,
}

impl Default for SpatializerData {
    fn default() -> Self {
        Self {
            source_matrix: Matrix4::IDENTITY,
            listener_matrix: Matrix4::IDENTITY,
            spatial_blend: 1.0,
        }
    }
}

/// Per-instance state the host passes into every process call
#[derive(Clone, Copy, Debug)]
pub struct EffectState {
    pub is_playing: bool,
    pub is_paused: bool,
    pub is_muted: bool,
    /// The host's configured callback block size in frames
    pub dsp_buffer_size: usize,
    /// Running sample clock, advances by the tick length each callback
    pub current_dsp_tick: u64,
    /// Present only on sources the host wants spatialized
    pub spatializer: Option<SpatializerData>,
}

impl Default for EffectState {
    fn default() -> Self {
        Self {
            is_playing: true,
            is_paused: false,
            is_muted: false,
            dsp_buffer_size: QUANTUM,
            current_dsp_tick: 0,
            spatializer: None,
        }
    }
}
