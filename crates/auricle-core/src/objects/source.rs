//! Per-source state for the object backend
//!
//! Split in two, because the pump needs internal state the host must not
//! touch: `ObjectSourceInner` is shared with the adapter's source table and
//! serviced by the pump; `ObjectSourceHandle` is the host-side writer
//! returned to the effect. Dropping the handle only marks the inner state
//! for deletion; the pump prunes it on its next pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::ring::{RingReader, RingWriter};
use crate::types::{AlignedFloats, DspVec, PREROLL_BUFFERS, QUANTUM};

use super::adapter::ObjectAdapter;
use super::stream::SpatialObject;

/// Parameters the pump applies to the audio object each pass
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ObjectSourceParams {
    /// Arrival direction/position in the engine frame
    pub primary_arrival_direction: DspVec,
    /// Applied as an amplitude volume on the object
    pub primary_arrival_distance_power_db: f32,
}

/// Pump-side source state, held in the adapter's table
pub(crate) struct ObjectSourceInner {
    index: usize,
    params: Mutex<ObjectSourceParams>,
    reader: RingReader,
    object: Mutex<Option<Box<dyn SpatialObject>>>,
    prerolled: AtomicBool,
    active: AtomicBool,
}

impl ObjectSourceInner {
    pub(crate) fn new(index: usize, reader: RingReader, object: Box<dyn SpatialObject>) -> Self {
        Self {
            index,
            params: Mutex::new(ObjectSourceParams::default()),
            reader,
            object: Mutex::new(Some(object)),
            prerolled: AtomicBool::new(false),
            active: AtomicBool::new(true),
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_parameters(&self, params: ObjectSourceParams) {
        *self.params.lock().unwrap_or_else(|p| p.into_inner()) = params;
    }

    pub(crate) fn parameters(&self) -> ObjectSourceParams {
        *self.params.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Replace the audio object after a device change
    pub(crate) fn set_object(&self, object: Box<dyn SpatialObject>) {
        *self.object.lock().unwrap_or_else(|p| p.into_inner()) = Some(object);
    }

    pub(crate) fn with_object<F: FnOnce(&mut dyn SpatialObject)>(&self, f: F) {
        let mut guard = self.object.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(object) = guard.as_mut() {
            f(object.as_mut());
        }
    }

    /// Preroll gate. Until prerolled, the ring must hold more than
    /// `required * PREROLL_BUFFERS` samples; once rolling, consumption
    /// continues while any samples remain. A full starvation clears the
    /// preroll so the next fill waits for the full amount again.
    pub(crate) fn has_enough_buffered(&self, required: usize) -> bool {
        let buffered = self.reader.buffered_samples();
        let prerolled = self.prerolled.load(Ordering::Relaxed);
        let enough = if prerolled {
            buffered > required
        } else {
            buffered > required * PREROLL_BUFFERS
        };
        let ok = enough || (prerolled && buffered > 0);
        self.prerolled.store(ok, Ordering::Relaxed);
        ok
    }

    pub(crate) fn read_into(&self, dst: &mut [f32]) -> usize {
        self.reader.read(dst)
    }

    /// Empty the ring and require a fresh preroll
    pub(crate) fn clear_buffering(&self) {
        self.reader.clear();
        self.prerolled.store(false, Ordering::Relaxed);
    }

    pub(crate) fn buffered_samples(&self) -> usize {
        self.reader.buffered_samples()
    }

    pub(crate) fn mark_for_deletion(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Host-side writer for one spatial source
pub struct ObjectSourceHandle {
    pub(crate) inner: Arc<ObjectSourceInner>,
    writer: RingWriter,
    adapter: Arc<ObjectAdapter>,
    staging: AlignedFloats,
}

impl ObjectSourceHandle {
    pub(crate) fn new(
        inner: Arc<ObjectSourceInner>,
        writer: RingWriter,
        adapter: Arc<ObjectAdapter>,
    ) -> Self {
        Self {
            inner,
            writer,
            adapter,
            staging: AlignedFloats::new(QUANTUM),
        }
    }

    pub fn index(&self) -> usize {
        self.inner.index()
    }

    pub fn set_parameters(&self, params: ObjectSourceParams) {
        self.inner.set_parameters(params);
    }

    /// Staging frame for this tick's mono samples. Also tells the adapter
    /// the host is alive, restarting the stream after a quiescent stop.
    pub fn buffer(&mut self) -> &mut [f32] {
        self.adapter.on_host_process();
        self.staging.as_mut_slice()
    }

    /// Commit the first `samples_written` staged samples into the ring
    pub fn commit(&mut self, samples_written: usize) {
        let n = samples_written.min(self.staging.len());
        self.writer.write(&self.staging.as_slice()[..n]);
    }
}

impl Drop for ObjectSourceHandle {
    fn drop(&mut self) {
        // Deferred: the pump prunes the table entry on its next pass
        self.inner.mark_for_deletion();
    }
}
