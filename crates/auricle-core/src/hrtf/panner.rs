//! Built-in constant-power panning engine
//!
//! Stands in for the external HRTF DSP library behind the same trait: no
//! convolution, just per-slot gain from the arrival powers and a
//! constant-power pan from the arrival direction. Multichannel formats
//! route to the front pair. Keeps a smoothed per-slot gain so `reset`
//! has observable meaning.

use crate::error::{SpatialError, SpatialResult};
use crate::hrtf::api::{
    AcousticParameters, EngineKind, HrtfEngine, HrtfQuality, OutputFormat,
};
use crate::types::{db_to_amplitude, MAX_SOURCES};

#[derive(Clone, Copy)]
struct PannerSlot {
    acquired: bool,
    params: AcousticParameters,
    /// Gain at the end of the previous render, ramp origin for this one
    last_gain: f32,
}

impl Default for PannerSlot {
    fn default() -> Self {
        Self {
            acquired: false,
            params: AcousticParameters::default(),
            last_gain: 0.0,
        }
    }
}

/// Reference engine; registered once per [`EngineKind`] the system fronts
pub struct PannerEngine {
    kind: EngineKind,
    format: OutputFormat,
    slots: Vec<PannerSlot>,
}

impl PannerEngine {
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            format: OutputFormat::Stereo,
            slots: vec![PannerSlot::default(); MAX_SOURCES],
        }
    }

    /// Left/right gains for a unit arrival direction.
    ///
    /// The engine frame negates the host X axis, so host-right maps to
    /// engine -X; overhead or dead-ahead arrivals pan dead centre.
    fn pan_gains(direction: crate::types::DspVec) -> (f32, f32) {
        let pan = (-direction.x).clamp(-1.0, 1.0);
        let left = ((1.0 - pan) * 0.5).sqrt();
        let right = ((1.0 + pan) * 0.5).sqrt();
        (left, right)
    }
}

impl HrtfEngine for PannerEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn acquire(&mut self, slot: usize) -> SpatialResult<()> {
        let state = self
            .slots
            .get_mut(slot)
            .ok_or_else(|| SpatialError::Resource(format!("slot {slot} out of range")))?;
        state.acquired = true;
        state.params = AcousticParameters::default();
        state.last_gain = 0.0;
        Ok(())
    }

    fn release(&mut self, slot: usize) {
        if let Some(state) = self.slots.get_mut(slot) {
            *state = PannerSlot::default();
        }
    }

    fn reset(&mut self, slot: usize) {
        if let Some(state) = self.slots.get_mut(slot) {
            state.last_gain = 0.0;
        }
    }

    fn reset_all(&mut self) {
        for state in &mut self.slots {
            state.last_gain = 0.0;
        }
    }

    fn set_output_format(&mut self, format: OutputFormat) -> SpatialResult<()> {
        if format == OutputFormat::Unsupported {
            return Err(SpatialError::Unsupported("output format".into()));
        }
        self.format = format;
        Ok(())
    }

    fn set_parameters(&mut self, slot: usize, params: &AcousticParameters) -> SpatialResult<()> {
        match self.slots.get_mut(slot) {
            Some(state) if state.acquired => {
                state.params = *params;
                Ok(())
            }
            _ => Err(SpatialError::Resource(format!("slot {slot} not acquired"))),
        }
    }

    fn render(&mut self, inputs: &[Option<&[f32]>], out: &mut [f32]) -> usize {
        let Some(channels) = self.format.channels() else {
            return 0;
        };
        out.fill(0.0);
        let frames = out.len() / channels;
        for (slot, input) in inputs.iter().enumerate() {
            let Some(samples) = input else { continue };
            let Some(state) = self.slots.get_mut(slot) else { continue };
            if !state.acquired || state.params.quality == HrtfQuality::Bypass {
                continue;
            }
            let target = db_to_amplitude(
                state.params.primary_arrival_geometry_power_db
                    + state.params.primary_arrival_distance_power_db,
            );
            let (left, right) = Self::pan_gains(state.params.primary_arrival_direction);
            let start = state.last_gain;
            let n = frames.min(samples.len());
            for (i, &s) in samples[..n].iter().enumerate() {
                // Linear gain ramp across the block to avoid zipper noise
                let g = start + (target - start) * ((i + 1) as f32 / n as f32);
                match channels {
                    1 => out[i] += s * g,
                    _ => {
                        out[i * channels] += s * g * left;
                        out[i * channels + 1] += s * g * right;
                    }
                }
            }
            state.last_gain = target;
        }
        out.len()
    }
}
