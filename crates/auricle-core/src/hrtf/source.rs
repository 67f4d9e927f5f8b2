//! Owning source handles over pool slots
//!
//! A handle exclusively owns one slot for its lifetime and releases it on
//! drop. The system sits behind a short-held mutex shared by the mixer
//! thread and, on the object backend, the render pump; every handle
//! operation locks, acts and unlocks.

use std::sync::{Arc, Mutex, OnceLock};

use crate::error::SpatialResult;
use crate::hrtf::api::AcousticParameters;
use crate::hrtf::system::HrtfSystem;

/// Shared handle to the engine system
pub type SharedHrtfSystem = Arc<Mutex<HrtfSystem>>;

fn lock(system: &SharedHrtfSystem) -> std::sync::MutexGuard<'_, HrtfSystem> {
    system.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exclusive owner of one pool slot. Non-copyable; releasing is dropping.
pub struct SourceHandle {
    system: SharedHrtfSystem,
    slot: usize,
}

impl SourceHandle {
    /// Acquire a free slot in every registered engine
    pub fn acquire(system: &SharedHrtfSystem) -> SpatialResult<SourceHandle> {
        let slot = lock(system).acquire_slot()?;
        Ok(SourceHandle { system: Arc::clone(system), slot })
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Commit this tick's acoustic parameters to the active engine
    pub fn set_parameters(&self, params: &AcousticParameters) {
        lock(&self.system).set_parameters(self.slot, params);
    }

    /// Run `write` over `len` samples of slot scratch starting at `offset`.
    /// Returns false without invoking `write` when the scratch is not
    /// available this tick (slot torn down, or span outside the quantum).
    pub fn with_scratch<F>(&self, offset: usize, len: usize, write: F) -> bool
    where
        F: FnOnce(&mut [f32]),
    {
        let mut system = lock(&self.system);
        match system.slot_scratch_mut(self.slot, offset, len) {
            Some(scratch) => {
                write(scratch);
                true
            }
            None => false,
        }
    }
}

impl Drop for SourceHandle {
    fn drop(&mut self) {
        lock(&self.system).release_slot(self.slot);
    }
}

static GLOBAL_SYSTEM: OnceLock<Mutex<Option<SharedHrtfSystem>>> = OnceLock::new();

/// The process-wide system, created lazily on first use.
///
/// Initialisation failure leaves the global unset so a later call retries;
/// the host plugin ABI has no plugin-level context to hang this state on.
pub fn global_system() -> SpatialResult<SharedHrtfSystem> {
    let cell = GLOBAL_SYSTEM.get_or_init(|| Mutex::new(None));
    let mut slot = cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(system) = slot.as_ref() {
        return Ok(Arc::clone(system));
    }
    let system = Arc::new(Mutex::new(HrtfSystem::with_default_engines()?));
    *slot = Some(Arc::clone(&system));
    Ok(system)
}
