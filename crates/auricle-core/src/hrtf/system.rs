//! Engine adapter and source-slot pool
//!
//! Owns the aligned per-slot input scratch, the descriptor array the render
//! polls, the free-slot stack and the registered engines. Engines share slot
//! indices; acquiring a slot is all-or-nothing across all of them.

use crate::error::{SpatialError, SpatialResult};
use crate::hrtf::api::{
    AcousticParameters, EngineKind, HrtfEngine, OutputFormat, SlotDescriptor,
};
use crate::hrtf::panner::PannerEngine;
use crate::types::{AlignedFloats, MAX_SOURCES, QUANTUM};

pub struct HrtfSystem {
    engines: Vec<Box<dyn HrtfEngine>>,
    active_engine: usize,
    scratch: Vec<AlignedFloats>,
    descriptors: Vec<SlotDescriptor>,
    /// Seeded in reverse so slot 0 is handed out first
    free_slots: Vec<usize>,
    format: OutputFormat,
    global_reverb_power_db: f32,
    global_reverb_time_scale: f32,
}

impl HrtfSystem {
    /// Build a system fronting the given engines. The first engine is active.
    pub fn new(engines: Vec<Box<dyn HrtfEngine>>) -> SpatialResult<Self> {
        if engines.is_empty() {
            return Err(SpatialError::FatalInit("no engines registered".into()));
        }
        let mut free_slots: Vec<usize> = (0..MAX_SOURCES).collect();
        free_slots.reverse();
        log::info!(
            "hrtf system initialised: {} engine(s), {} slots, quantum {}",
            engines.len(),
            MAX_SOURCES,
            QUANTUM
        );
        Ok(Self {
            engines,
            active_engine: 0,
            scratch: (0..MAX_SOURCES).map(|_| AlignedFloats::new(QUANTUM)).collect(),
            descriptors: vec![SlotDescriptor::default(); MAX_SOURCES],
            free_slots,
            format: OutputFormat::Stereo,
            global_reverb_power_db: 0.0,
            global_reverb_time_scale: 1.0,
        })
    }

    /// The usual configuration: binaural path plus a panner alternate
    pub fn with_default_engines() -> SpatialResult<Self> {
        Self::new(vec![
            Box::new(PannerEngine::new(EngineKind::Binaural)),
            Box::new(PannerEngine::new(EngineKind::Panner)),
        ])
    }

    /// Pop a free slot and acquire it in every engine. All-or-nothing: a
    /// failure in any engine releases the ones already acquired.
    pub fn acquire_slot(&mut self) -> SpatialResult<usize> {
        let Some(slot) = self.free_slots.pop() else {
            log::warn!("source pool exhausted ({MAX_SOURCES} slots)");
            return Err(SpatialError::PoolExhausted(MAX_SOURCES));
        };
        for i in 0..self.engines.len() {
            if let Err(e) = self.engines[i].acquire(slot) {
                for engine in &mut self.engines[..i] {
                    engine.release(slot);
                }
                self.free_slots.push(slot);
                log::warn!("engine acquire failed for slot {slot}: {e}");
                return Err(e);
            }
        }
        self.scratch[slot].fill_silence();
        self.descriptors[slot] = SlotDescriptor { active: true, frames: QUANTUM };
        log::debug!("slot {slot} acquired ({} free)", self.free_slots.len());
        Ok(slot)
    }

    /// Return a slot to the pool; nulls its descriptor and releases every
    /// engine's per-slot resources.
    pub fn release_slot(&mut self, slot: usize) {
        if slot >= MAX_SOURCES || !self.descriptors[slot].active {
            return;
        }
        self.descriptors[slot] = SlotDescriptor::default();
        for engine in &mut self.engines {
            engine.release(slot);
        }
        self.free_slots.push(slot);
        log::debug!("slot {slot} released ({} free)", self.free_slots.len());
    }

    /// Commit acoustic parameters to the active engine. Write failures are
    /// transient: logged and dropped, the slot stays live.
    pub fn set_parameters(&mut self, slot: usize, params: &AcousticParameters) {
        if let Err(e) = self.engines[self.active_engine].set_parameters(slot, params) {
            log::debug!("parameter write for slot {slot} skipped: {e}");
        }
    }

    /// Re-derive the output format from the channel count, applying it to the
    /// active engine when it changed. Returns false for unsupported counts.
    pub fn ensure_output_format(&mut self, channels: usize) -> bool {
        let format = OutputFormat::from_channels(channels);
        if format != self.format {
            self.format = format;
            if format == OutputFormat::Unsupported {
                log::warn!("unsupported output channel count {channels}");
            } else if let Err(e) = self.engines[self.active_engine].set_output_format(format) {
                log::warn!("engine rejected output format {format:?}: {e}");
            }
        }
        self.format != OutputFormat::Unsupported
    }

    /// The shared render pass: mix every active slot into `out`, then zero
    /// all slot scratch so the next tick starts clean. Returns samples
    /// written; 0 when the format is unsupported.
    pub fn render(&mut self, out: &mut [f32], channels: usize) -> usize {
        if !self.ensure_output_format(channels) {
            return 0;
        }
        let mut inputs: [Option<&[f32]>; MAX_SOURCES] = [None; MAX_SOURCES];
        for (slot, desc) in self.descriptors.iter().enumerate() {
            if desc.active {
                inputs[slot] = Some(&self.scratch[slot].as_slice()[..desc.frames]);
            }
        }
        let written = self.engines[self.active_engine].render(&inputs, out);
        for scratch in &mut self.scratch {
            scratch.fill_silence();
        }
        written
    }

    /// Switch which engine subsequent renders target.
    ///
    /// Binaural/Flex targets reset only the acquired slots; Panner flavours
    /// hold filter state shared across slots and reset everything. The
    /// current output format is re-applied to the new engine.
    pub fn set_active_engine(&mut self, kind: EngineKind) -> SpatialResult<()> {
        let Some(index) = self.engines.iter().position(|e| e.kind() == kind) else {
            return Err(SpatialError::Unsupported(format!("no {kind:?} engine registered")));
        };
        if index == self.active_engine {
            return Ok(());
        }
        match kind {
            EngineKind::Panner | EngineKind::PannerOnly => self.engines[index].reset_all(),
            _ => {
                for slot in 0..MAX_SOURCES {
                    if self.descriptors[slot].active {
                        self.engines[index].reset(slot);
                    }
                }
            }
        }
        if self.format != OutputFormat::Unsupported {
            if let Err(e) = self.engines[index].set_output_format(self.format) {
                log::warn!("new active engine rejected format {:?}: {e}", self.format);
            }
        }
        self.active_engine = index;
        log::info!("active engine switched to {kind:?}");
        Ok(())
    }

    pub fn active_engine_kind(&self) -> EngineKind {
        self.engines[self.active_engine].kind()
    }

    /// Mutable view into a slot's scratch, or None when the slot is not
    /// live or the span does not fit the quantum.
    pub fn slot_scratch_mut(&mut self, slot: usize, offset: usize, len: usize) -> Option<&mut [f32]> {
        let desc = self.descriptors.get(slot)?;
        if !desc.active || offset + len > desc.frames {
            return None;
        }
        Some(&mut self.scratch[slot].as_mut_slice()[offset..offset + len])
    }

    pub fn descriptor(&self, slot: usize) -> SlotDescriptor {
        self.descriptors.get(slot).copied().unwrap_or_default()
    }

    pub fn free_slot_count(&self) -> usize {
        self.free_slots.len()
    }

    pub fn set_global_reverb_power_adjustment(&mut self, db: f32) {
        self.global_reverb_power_db = db;
    }

    pub fn set_global_reverb_time_adjustment(&mut self, scale: f32) {
        self.global_reverb_time_scale = scale;
    }

    pub fn global_reverb_power_db(&self) -> f32 {
        self.global_reverb_power_db
    }

    pub fn global_reverb_time_scale(&self) -> f32 {
        self.global_reverb_time_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    /// Engine that fails to acquire after a configurable number of slots,
    /// journalling acquire/release calls into a shared log
    struct FailingEngine {
        kind: EngineKind,
        budget: usize,
        live: usize,
        log: Arc<Mutex<Vec<(EngineKind, &'static str, usize)>>>,
    }

    impl FailingEngine {
        fn new(
            kind: EngineKind,
            budget: usize,
            log: Arc<Mutex<Vec<(EngineKind, &'static str, usize)>>>,
        ) -> Self {
            Self { kind, budget, live: 0, log }
        }
    }

    impl HrtfEngine for FailingEngine {
        fn kind(&self) -> EngineKind {
            self.kind
        }
        fn acquire(&mut self, slot: usize) -> SpatialResult<()> {
            if self.live >= self.budget {
                return Err(SpatialError::Resource("budget spent".into()));
            }
            self.live += 1;
            self.log.lock().unwrap().push((self.kind, "acquire", slot));
            Ok(())
        }
        fn release(&mut self, slot: usize) {
            self.live = self.live.saturating_sub(1);
            self.log.lock().unwrap().push((self.kind, "release", slot));
        }
        fn reset(&mut self, _slot: usize) {}
        fn reset_all(&mut self) {}
        fn set_output_format(&mut self, _format: OutputFormat) -> SpatialResult<()> {
            Ok(())
        }
        fn set_parameters(&mut self, _slot: usize, _params: &AcousticParameters) -> SpatialResult<()> {
            Ok(())
        }
        fn render(&mut self, _inputs: &[Option<&[f32]>], out: &mut [f32]) -> usize {
            out.len()
        }
    }

    #[test]
    fn test_slot_zero_first() {
        let mut sys = HrtfSystem::with_default_engines().unwrap();
        assert_eq!(sys.acquire_slot().unwrap(), 0);
        assert_eq!(sys.acquire_slot().unwrap(), 1);
    }

    #[test]
    fn test_descriptor_tracks_ownership() {
        let mut sys = HrtfSystem::with_default_engines().unwrap();
        let slot = sys.acquire_slot().unwrap();
        assert!(sys.descriptor(slot).active);
        assert_eq!(sys.descriptor(slot).frames, QUANTUM);
        sys.release_slot(slot);
        assert!(!sys.descriptor(slot).active);
        // Double release is a no-op, the free list stays consistent
        sys.release_slot(slot);
        assert_eq!(sys.free_slot_count(), MAX_SOURCES);
    }

    #[test]
    fn test_pool_exhaustion_and_reuse() {
        let mut sys = HrtfSystem::with_default_engines().unwrap();
        let slots: Vec<usize> = (0..MAX_SOURCES).map(|_| sys.acquire_slot().unwrap()).collect();
        assert!(matches!(sys.acquire_slot(), Err(SpatialError::PoolExhausted(_))));
        sys.release_slot(slots[17]);
        assert_eq!(sys.acquire_slot().unwrap(), 17);
    }

    #[test]
    fn test_all_or_nothing_acquire() {
        // Second engine refuses every acquire: the first engine must see a
        // matching release and the slot must return to the free list
        let log = Arc::new(Mutex::new(Vec::new()));
        let sys_engines: Vec<Box<dyn HrtfEngine>> = vec![
            Box::new(FailingEngine::new(EngineKind::Binaural, usize::MAX, Arc::clone(&log))),
            Box::new(FailingEngine::new(EngineKind::Panner, 0, Arc::clone(&log))),
        ];
        let mut sys = HrtfSystem::new(sys_engines).unwrap();
        assert!(sys.acquire_slot().is_err());
        assert_eq!(sys.free_slot_count(), MAX_SOURCES);
        assert!(!sys.descriptor(0).active);
        assert_eq!(
            &*log.lock().unwrap(),
            &[(EngineKind::Binaural, "acquire", 0), (EngineKind::Binaural, "release", 0)]
        );
    }

    #[test]
    fn test_render_zeroes_scratch() {
        let mut sys = HrtfSystem::with_default_engines().unwrap();
        let slot = sys.acquire_slot().unwrap();
        sys.slot_scratch_mut(slot, 0, 4).unwrap().copy_from_slice(&[1.0; 4]);
        let mut out = vec![0.0f32; QUANTUM * 2];
        assert!(sys.render(&mut out, 2) > 0);
        let scratch = sys.slot_scratch_mut(slot, 0, QUANTUM).unwrap();
        assert!(scratch.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_unsupported_channel_count_renders_nothing() {
        let mut sys = HrtfSystem::with_default_engines().unwrap();
        let mut out = vec![0.0f32; QUANTUM * 3];
        assert_eq!(sys.render(&mut out, 3), 0);
        // Recovers once a supported count comes back
        let mut out2 = vec![0.0f32; QUANTUM * 2];
        assert!(sys.render(&mut out2, 2) > 0);
    }

    #[test]
    fn test_scratch_guard_rejects_out_of_range() {
        let mut sys = HrtfSystem::with_default_engines().unwrap();
        let slot = sys.acquire_slot().unwrap();
        assert!(sys.slot_scratch_mut(slot, QUANTUM - 4, 8).is_none());
        assert!(sys.slot_scratch_mut(slot + 1, 0, 4).is_none());
    }

    #[test]
    fn test_engine_switch() {
        let mut sys = HrtfSystem::with_default_engines().unwrap();
        assert_eq!(sys.active_engine_kind(), EngineKind::Binaural);
        sys.set_active_engine(EngineKind::Panner).unwrap();
        assert_eq!(sys.active_engine_kind(), EngineKind::Panner);
        // Switching to an unregistered engine is refused and state is kept
        assert!(sys.set_active_engine(EngineKind::Flex).is_err());
        assert_eq!(sys.active_engine_kind(), EngineKind::Panner);
    }
}
