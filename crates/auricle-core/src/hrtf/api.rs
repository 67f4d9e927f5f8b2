//! Engine-facing types and the HRTF engine trait

use crate::error::SpatialResult;
use crate::types::{
    DspVec, DEFAULT_EARLY_REFLECTIONS_POWER_DB, DEFAULT_EARLY_REFLECTIONS_T60,
    DEFAULT_LATE_REVERB_T60, MIN_SOURCE_DISTANCE,
};

/// Which DSP engine flavour a slot renders through
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineKind {
    Binaural,
    Panner,
    Flex,
    ReverbOnly,
    PannerOnly,
}

/// Output bus layouts the engine can render
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Mono,
    Stereo,
    Quad,
    Surround5,
    Surround5Dot1,
    Surround7Dot1,
    /// Sentinel for channel counts the engine cannot render
    Unsupported,
}

impl OutputFormat {
    /// Exact channel-count mapping; anything else is unsupported
    pub fn from_channels(channels: usize) -> Self {
        match channels {
            1 => OutputFormat::Mono,
            2 => OutputFormat::Stereo,
            4 => OutputFormat::Quad,
            5 => OutputFormat::Surround5,
            6 => OutputFormat::Surround5Dot1,
            8 => OutputFormat::Surround7Dot1,
            _ => OutputFormat::Unsupported,
        }
    }

    pub fn channels(&self) -> Option<usize> {
        match self {
            OutputFormat::Mono => Some(1),
            OutputFormat::Stereo => Some(2),
            OutputFormat::Quad => Some(4),
            OutputFormat::Surround5 => Some(5),
            OutputFormat::Surround5Dot1 => Some(6),
            OutputFormat::Surround7Dot1 => Some(8),
            OutputFormat::Unsupported => None,
        }
    }
}

/// Engine quality tier selected by the HrtfMode parameter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HrtfQuality {
    /// Mode 0: slot renders nothing
    Bypass,
    #[default]
    Good,
    Better,
    Best,
}

impl HrtfQuality {
    /// Quantise the 0..3 parameter value
    pub fn from_param(value: f32) -> Self {
        match value.round().clamp(0.0, 3.0) as u32 {
            0 => HrtfQuality::Bypass,
            1 => HrtfQuality::Good,
            2 => HrtfQuality::Better,
            _ => HrtfQuality::Best,
        }
    }
}

/// Per-slot acoustic parameters consumed by the engine each render
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcousticParameters {
    /// Unit vector toward the primary arrival, engine frame
    pub primary_arrival_direction: DspVec,
    pub primary_arrival_geometry_power_db: f32,
    pub primary_arrival_distance_power_db: f32,
    /// Zero vector disables the secondary (transmission) path
    pub secondary_arrival_direction: DspVec,
    pub secondary_arrival_geometry_power_db: f32,
    pub secondary_arrival_distance_power_db: f32,
    pub effective_source_distance: f32,
    pub early_reflections_power_db: f32,
    pub early_reflections_60db_decay_seconds: f32,
    pub late_reverb_60db_decay_seconds: f32,
    /// 0 = enclosed room, 1 = open outdoors
    pub outdoorness: f32,
    pub quality: HrtfQuality,
}

impl Default for AcousticParameters {
    fn default() -> Self {
        Self {
            primary_arrival_direction: DspVec::ZERO,
            primary_arrival_geometry_power_db: 0.0,
            primary_arrival_distance_power_db: 0.0,
            secondary_arrival_direction: DspVec::ZERO,
            secondary_arrival_geometry_power_db: -120.0,
            secondary_arrival_distance_power_db: 0.0,
            effective_source_distance: MIN_SOURCE_DISTANCE,
            early_reflections_power_db: DEFAULT_EARLY_REFLECTIONS_POWER_DB,
            early_reflections_60db_decay_seconds: DEFAULT_EARLY_REFLECTIONS_T60,
            late_reverb_60db_decay_seconds: DEFAULT_LATE_REVERB_T60,
            outdoorness: 0.5,
            quality: HrtfQuality::default(),
        }
    }
}

/// What the engine polls per slot to decide which inputs are live this render
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotDescriptor {
    /// True while the slot is owned by a live source handle
    pub active: bool,
    /// Usable scratch length in samples while active
    pub frames: usize,
}

/// Seam to the DSP engine. Engines sharing slot indices are registered
/// together in the system; per-slot resources are the engine's own.
pub trait HrtfEngine: Send {
    fn kind(&self) -> EngineKind;

    /// Allocate the engine-side resources for a slot
    fn acquire(&mut self, slot: usize) -> SpatialResult<()>;

    fn release(&mut self, slot: usize);

    /// Clear one slot's filter/reverb state
    fn reset(&mut self, slot: usize);

    /// Clear all state, including state shared across slots
    fn reset_all(&mut self);

    fn set_output_format(&mut self, format: OutputFormat) -> SpatialResult<()>;

    fn set_parameters(&mut self, slot: usize, params: &AcousticParameters) -> SpatialResult<()>;

    /// Mix every `Some` input into the interleaved `out` bus. Returns samples
    /// written; 0 means the render produced nothing (e.g. unsupported format).
    fn render(&mut self, inputs: &[Option<&[f32]>], out: &mut [f32]) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_channel_mapping_is_exact() {
        for ch in [1usize, 2, 4, 5, 6, 8] {
            assert_eq!(OutputFormat::from_channels(ch).channels(), Some(ch));
        }
        assert_eq!(OutputFormat::from_channels(3), OutputFormat::Unsupported);
        assert_eq!(OutputFormat::from_channels(7), OutputFormat::Unsupported);
        assert_eq!(OutputFormat::from_channels(0), OutputFormat::Unsupported);
    }

    #[test]
    fn test_quality_quantisation() {
        assert_eq!(HrtfQuality::from_param(0.0), HrtfQuality::Bypass);
        assert_eq!(HrtfQuality::from_param(0.4), HrtfQuality::Bypass);
        assert_eq!(HrtfQuality::from_param(1.2), HrtfQuality::Good);
        assert_eq!(HrtfQuality::from_param(2.5), HrtfQuality::Best);
        assert_eq!(HrtfQuality::from_param(9.0), HrtfQuality::Best);
        assert_eq!(HrtfQuality::from_param(-1.0), HrtfQuality::Bypass);
    }
}
