//! Shared mixer effect
//!
//! One instance on the host's output bus. Runs after all per-source
//! effects have written their scratch for the tick: commits the global
//! reverb adjustments, invokes the engine's multi-slot render and mixes
//! the result into the bus. When the host tick is shorter than the engine
//! quantum, renders land in a pre-allocated history buffer that is drained
//! one tick-sized span at a time.

use crate::error::{SpatialError, SpatialResult};
use crate::host::{EffectState, ProcessStatus};
use crate::hrtf::{EngineKind, SharedHrtfSystem};
use crate::spatializer::params::{default_mixer_params, MixerParam};
use crate::types::{is_power_of_two, AlignedFloats, MAX_OUTPUT_CHANNELS, QUANTUM};
use crate::vecmath;

pub struct MixerEffect {
    system: SharedHrtfSystem,
    params: [f32; MixerParam::COUNT],
    /// Sized for the widest format up front; the hot path never allocates
    history: AlignedFloats,
    history_read_offset: usize,
}

impl MixerEffect {
    pub fn new(system: SharedHrtfSystem) -> Self {
        Self {
            system,
            params: default_mixer_params(),
            history: AlignedFloats::new(QUANTUM * MAX_OUTPUT_CHANNELS),
            history_read_offset: 0,
        }
    }

    pub fn set_param(&mut self, index: usize, value: f32) -> SpatialResult<()> {
        let Some(param) = MixerParam::from_index(index) else {
            return Err(SpatialError::Unsupported(format!("parameter index {index}")));
        };
        self.params[index] = value;
        if param == MixerParam::UsePanner {
            // Engine switch applies immediately, not on the next tick
            let kind = if value == 1.0 { EngineKind::Panner } else { EngineKind::Binaural };
            let mut sys = self.system.lock().unwrap_or_else(|p| p.into_inner());
            if let Err(e) = sys.set_active_engine(kind) {
                log::warn!("engine switch to {kind:?} failed: {e}");
            }
        }
        Ok(())
    }

    pub fn param(&self, index: usize) -> SpatialResult<f32> {
        self.params
            .get(index)
            .copied()
            .ok_or_else(|| SpatialError::Unsupported(format!("parameter index {index}")))
    }

    /// Per-tick process over the output bus
    pub fn process(
        &mut self,
        state: &EffectState,
        input: &[f32],
        output: &mut [f32],
        channels_in: usize,
        channels_out: usize,
    ) -> ProcessStatus {
        if channels_in != channels_out
            || channels_out == 0
            || input.len() != output.len()
            || input.len() % channels_out != 0
        {
            return ProcessStatus::Unsupported;
        }
        let length = input.len() / channels_out;

        {
            let mut sys = self.system.lock().unwrap_or_else(|p| p.into_inner());
            sys.set_global_reverb_power_adjustment(self.params[MixerParam::ReverbPowerAdjust.index()]);
            sys.set_global_reverb_time_adjustment(self.params[MixerParam::ReverbTimeScale.index()]);
        }

        if !state.is_playing
            || !is_power_of_two(length)
            || length > QUANTUM
            || state.dsp_buffer_size != length
        {
            output.copy_from_slice(input);
            return ProcessStatus::Ok;
        }

        if length == QUANTUM {
            // Direct path: render straight into the bus, then pass the
            // non-spatialized content through on top
            let written = {
                let mut sys = self.system.lock().unwrap_or_else(|p| p.into_inner());
                sys.render(output, channels_out)
            };
            if written > 0 {
                vecmath::add_assign(output, input);
            } else {
                output.copy_from_slice(input);
            }
            return ProcessStatus::Ok;
        }

        // History path: Length < Quantum. Render once per quantum on the
        // last sub-tick, drain one tick-sized span per callback.
        let ticks_per_quantum = QUANTUM / length;
        let current_tick = (state.current_dsp_tick as usize / length) % ticks_per_quantum;
        let span = length * channels_out;
        let history_len = QUANTUM * channels_out;

        if current_tick == ticks_per_quantum - 1 {
            self.history_read_offset = 0;
            let mut sys = self.system.lock().unwrap_or_else(|p| p.into_inner());
            let history = &mut self.history.as_mut_slice()[..history_len];
            if sys.render(history, channels_out) == 0 {
                history.fill(0.0);
            }
        }
        if self.history_read_offset + span > history_len {
            // Host tick phase moved under us (buffer-size change mid-quantum)
            self.history_read_offset = 0;
        }
        let start = self.history_read_offset;
        output.copy_from_slice(&self.history.as_slice()[start..start + span]);
        self.history_read_offset += span;
        vecmath::add_assign(output, input);
        ProcessStatus::Ok
    }
}
