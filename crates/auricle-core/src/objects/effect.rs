//! Per-source effect for the object backend
//!
//! Same host contract as the mixer-backend effect, but instead of slot
//! scratch the downmixed audio goes into the source's ring and the
//! translated direction/volume pair is handed to the render pump.

use std::sync::Arc;

use crate::error::{SpatialError, SpatialResult};
use crate::host::{EffectState, ProcessStatus};
use crate::spatializer::{
    default_spatializer_params, listener_to_source_direction, SpatializerParam,
};
use crate::types::{amplitude_to_db, is_power_of_two, MIN_AUDIBLE_GAIN, MIN_SPATIAL_BLEND, QUANTUM};
use crate::vecmath;

use super::adapter::ObjectAdapter;
use super::source::{ObjectSourceHandle, ObjectSourceParams};

pub struct ObjectSpatializerEffect {
    adapter: Arc<ObjectAdapter>,
    source: Option<ObjectSourceHandle>,
    params: [f32; SpatializerParam::COUNT],
    source_distance: f32,
    dry_distance_attenuation: f32,
}

impl ObjectSpatializerEffect {
    /// Creation activates the stream on first use and must yield a source
    pub fn new(adapter: Arc<ObjectAdapter>) -> SpatialResult<Self> {
        let source = adapter
            .get_source()
            .ok_or_else(|| SpatialError::Unsupported("no spatial source available".into()))?;
        Ok(Self {
            adapter,
            source: Some(source),
            params: default_spatializer_params(),
            source_distance: 0.0,
            dry_distance_attenuation: 1.0,
        })
    }

    pub fn set_param(&mut self, index: usize, value: f32) -> SpatialResult<()> {
        if index >= SpatializerParam::COUNT {
            return Err(SpatialError::Unsupported(format!("parameter index {index}")));
        }
        self.params[index] = value;
        Ok(())
    }

    pub fn param(&self, index: usize) -> SpatialResult<f32> {
        self.params
            .get(index)
            .copied()
            .ok_or_else(|| SpatialError::Unsupported(format!("parameter index {index}")))
    }

    /// Same contract as the mixer-backend attenuation callback
    pub fn distance_attenuation(&mut self, distance: f32, attenuation: f32) -> f32 {
        self.source_distance = distance;
        self.dry_distance_attenuation = attenuation;
        if attenuation < MIN_AUDIBLE_GAIN {
            0.0
        } else {
            1.0
        }
    }

    fn should_spatialize(&self, state: &EffectState, length: usize) -> bool {
        let Some(data) = state.spatializer.as_ref() else {
            return false;
        };
        is_power_of_two(length)
            && length <= QUANTUM
            && state.is_playing
            && !state.is_paused
            && !state.is_muted
            && data.spatial_blend > MIN_SPATIAL_BLEND
            && self.dry_distance_attenuation > MIN_AUDIBLE_GAIN
    }

    pub fn process(
        &mut self,
        state: &EffectState,
        input: &[f32],
        output: &mut [f32],
        channels_in: usize,
        channels_out: usize,
    ) -> ProcessStatus {
        if channels_in != channels_out
            || channels_in == 0
            || input.len() != output.len()
            || input.len() % channels_in != 0
        {
            return ProcessStatus::Unsupported;
        }
        let length = input.len() / channels_in;

        if !self.should_spatialize(state, length) {
            // Dropping the handle marks the pump-side source for deletion
            self.source = None;
            if self.dry_distance_attenuation <= MIN_AUDIBLE_GAIN {
                output.fill(0.0);
            } else {
                vecmath::scale(output, input, self.dry_distance_attenuation);
            }
            return ProcessStatus::Ok;
        }
        let Some(data) = state.spatializer else {
            return ProcessStatus::Unsupported;
        };

        if self.source.is_none() {
            self.source = self.adapter.get_source();
        }
        let Some(source) = self.source.as_mut() else {
            output.fill(0.0);
            return ProcessStatus::Ok;
        };

        let direction =
            listener_to_source_direction(&data.source_matrix, &data.listener_matrix);
        source.set_parameters(ObjectSourceParams {
            primary_arrival_direction: direction.to_dsp().normalized_or_zero(),
            primary_arrival_distance_power_db: amplitude_to_db(self.dry_distance_attenuation),
        });

        let blend = data.spatial_blend;
        {
            let staging = source.buffer();
            for frame in 0..length {
                let mono = if channels_in == 1 {
                    input[frame]
                } else {
                    (input[frame * channels_in] + input[frame * channels_in + 1]) * 0.5
                };
                staging[frame] = mono * blend;
            }
        }
        source.commit(length);

        if blend >= 1.0 {
            output.fill(0.0);
        } else {
            vecmath::scale(output, input, 1.0 - blend);
        }
        ProcessStatus::Ok
    }
}
