//! Per-source spatializer effect
//!
//! One instance per host-created source. Owns the pool slot while the
//! source is spatialized, caches the distance/attenuation pair the host
//! reports through the attenuation callback, and per tick translates host
//! state into the slot's acoustic parameters before writing downmixed
//! input into the slot scratch.

use crate::acoustics::SharedAcoustics;
use crate::error::{SpatialError, SpatialResult};
use crate::host::{EffectState, ProcessStatus};
use crate::hrtf::{global_system, SharedHrtfSystem, SourceHandle};
use crate::spatializer::params::{default_spatializer_params, SpatializerParam};
use crate::spatializer::translator::{
    listener_world_position, source_world_position, translate_default, translate_queried,
    TranslationInputs,
};
use crate::types::{is_power_of_two, MIN_AUDIBLE_GAIN, MIN_SPATIAL_BLEND, QUANTUM};
use crate::vecmath;

pub struct SpatializerEffect {
    system: SharedHrtfSystem,
    acoustics: Option<SharedAcoustics>,
    handle: Option<SourceHandle>,
    params: [f32; SpatializerParam::COUNT],
    source_distance: f32,
    dry_distance_attenuation: f32,
}

impl SpatializerEffect {
    /// Create against an explicit system. Fails unless a slot could be
    /// acquired, which is the host contract for effect creation.
    pub fn new(
        system: SharedHrtfSystem,
        acoustics: Option<SharedAcoustics>,
    ) -> SpatialResult<Self> {
        let handle = SourceHandle::acquire(&system)?;
        Ok(Self {
            system,
            acoustics,
            handle: Some(handle),
            params: default_spatializer_params(),
            source_distance: 0.0,
            dry_distance_attenuation: 1.0,
        })
    }

    /// Create against the process-wide system
    pub fn create() -> SpatialResult<Self> {
        Self::new(global_system()?, None)
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

    /// Attenuation callback: the host asks what dry attenuation to apply.
    /// Always 1.0 (the render applies distance power itself), except below
    /// the audibility floor where 0.0 lets the host mute upstream. Caches
    /// both reported values for the translator.
    pub fn distance_attenuation(&mut self, distance: f32, attenuation: f32) -> f32 {
        self.source_distance = distance;
        self.dry_distance_attenuation = attenuation;
        if attenuation < MIN_AUDIBLE_GAIN {
            0.0
        } else {
            1.0
        }
    }

    /// Slot currently owned, if any. Test/diagnostic accessor.
    pub fn slot(&self) -> Option<usize> {
        self.handle.as_ref().map(|h| h.slot())
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

    /// Per-tick process. `input` and `output` are interleaved
    /// `length * channels` floats with identical channel counts.
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
            self.handle = None;
            if self.dry_distance_attenuation <= MIN_AUDIBLE_GAIN {
                output.fill(0.0);
            } else {
                vecmath::scale(output, input, self.dry_distance_attenuation);
            }
            return ProcessStatus::Ok;
        }
        // should_spatialize checked presence
        let Some(data) = state.spatializer else {
            return ProcessStatus::Unsupported;
        };

        if self.handle.is_none() {
            match SourceHandle::acquire(&self.system) {
                Ok(handle) => self.handle = Some(handle),
                Err(_) => {
                    output.fill(0.0);
                    return ProcessStatus::Ok;
                }
            }
        }
        let Some(handle) = self.handle.as_ref() else {
            return ProcessStatus::Ok;
        };

        let (global_power, global_time) = {
            let sys = self.system.lock().unwrap_or_else(|p| p.into_inner());
            (sys.global_reverb_power_db(), sys.global_reverb_time_scale())
        };
        let inputs = TranslationInputs {
            source_matrix: &data.source_matrix,
            listener_matrix: &data.listener_matrix,
            params: &self.params,
            source_distance: self.source_distance,
            dry_distance_attenuation: self.dry_distance_attenuation,
            global_reverb_power_db: global_power,
            global_reverb_time_scale: global_time,
        };

        let record = match self.acoustics.as_ref() {
            Some(acoustics) => {
                let mut ctx = acoustics.lock().unwrap_or_else(|p| p.into_inner());
                let source_world = source_world_position(&data.source_matrix);
                let listener_world = listener_world_position(&data.listener_matrix);
                let outdoorness = ctx
                    .query_outdoorness(listener_world)
                    .unwrap_or_else(|| ctx.last_outdoorness());
                match ctx.query_params(handle.slot(), source_world, listener_world) {
                    Some(query) => {
                        translate_queried(&inputs, &query, outdoorness, ctx.local_to_world())
                    }
                    None => translate_default(&inputs),
                }
            }
            None => translate_default(&inputs),
        };
        handle.set_parameters(&record);

        // Downmix into slot scratch at this tick's rotating offset inside
        // the quantum
        let offset = ((state.current_dsp_tick as usize / length) % (QUANTUM / length)) * length;
        let blend = data.spatial_blend;
        let wrote = handle.with_scratch(offset, length, |scratch| {
            for (frame, sample) in scratch.iter_mut().enumerate() {
                let mono = if channels_in == 1 {
                    input[frame]
                } else {
                    (input[frame * channels_in] + input[frame * channels_in + 1]) * 0.5
                };
                *sample = mono * blend;
            }
        });
        if !wrote {
            // Slot scratch vanished under us; skip this tick entirely
            return ProcessStatus::Ok;
        }

        // Dry path crossfade
        if blend >= 1.0 {
            output.fill(0.0);
        } else {
            vecmath::scale(output, input, 1.0 - blend);
        }
        ProcessStatus::Ok
    }
}
