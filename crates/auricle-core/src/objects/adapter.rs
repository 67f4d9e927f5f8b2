//! Object-backend adapter
//!
//! Owns the activated render stream, the source table the pump iterates,
//! and the stop-detection counter that decouples the 10 ms pump cadence
//! from the host's variable callback cadence. Activation happens lazily on
//! the first source request and is the one place allowed to block briefly.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use crate::error::SpatialResult;
use crate::ring::ring;
use crate::types::{db_to_amplitude, MAX_PUMP_PASSES_PER_HOST_TICK, MAX_SOURCES, RING_SAMPLES};

use super::pump::{Pump, PUMP_PERIOD};
use super::source::{ObjectSourceHandle, ObjectSourceInner};
use super::stream::{SpatialAudioClient, SpatialRenderStream};

struct AdapterState {
    client: Box<dyn SpatialAudioClient>,
    stream: Option<Box<dyn SpatialRenderStream>>,
    device_id: String,
    activated: bool,
    streaming: bool,
    sources: Vec<Option<Arc<ObjectSourceInner>>>,
}

pub struct ObjectAdapter {
    state: Mutex<AdapterState>,
    pump: Pump,
    /// Pump passes since the host last processed audio
    passes_since_host_tick: AtomicU32,
}

impl ObjectAdapter {
    pub fn new(client: Box<dyn SpatialAudioClient>) -> Arc<Self> {
        Self::with_pump_period(client, PUMP_PERIOD)
    }

    /// Pump cadence override; tests use a long period and drive passes
    /// manually
    pub fn with_pump_period(client: Box<dyn SpatialAudioClient>, period: Duration) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<ObjectAdapter>| {
            let worker = weak.clone();
            let pump = Pump::spawn(period, move || {
                if let Some(adapter) = worker.upgrade() {
                    adapter.worker_pass();
                }
            });
            ObjectAdapter {
                state: Mutex::new(AdapterState {
                    client,
                    stream: None,
                    device_id: String::new(),
                    activated: false,
                    streaming: false,
                    sources: (0..MAX_SOURCES).map(|_| None).collect(),
                }),
                pump,
                passes_since_host_tick: AtomicU32::new(0),
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, AdapterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Activate the stream on the current default device. Idempotent; the
    /// device id is recorded only after the whole sequence succeeded.
    fn activate_locked(state: &mut AdapterState) -> SpatialResult<()> {
        if state.activated {
            return Ok(());
        }
        let device_id = state.client.default_device_id();
        let stream = state.client.activate(&device_id)?;
        log::info!(
            "spatial render stream activated on '{device_id}' ({} objects max)",
            stream.max_objects()
        );
        state.stream = Some(stream);
        state.device_id = device_id;
        state.activated = true;
        Ok(())
    }

    /// Hand out a new spatial source, activating the stream first if
    /// needed. None when activation fails or the table is full.
    pub fn get_source(self: &Arc<Self>) -> Option<ObjectSourceHandle> {
        let mut state = self.lock();
        if let Err(e) = Self::activate_locked(&mut state) {
            log::warn!("spatial stream activation failed: {e}");
            return None;
        }
        let Some(index) = state.sources.iter().position(|s| s.is_none()) else {
            log::warn!("spatial source table full ({MAX_SOURCES})");
            return None;
        };
        let object = match state.stream.as_mut() {
            Some(stream) => match stream.activate_object() {
                Ok(object) => object,
                Err(e) => {
                    log::warn!("audio object activation failed: {e}");
                    return None;
                }
            },
            None => return None,
        };
        let (writer, reader) = ring(RING_SAMPLES, 1);
        let inner = Arc::new(ObjectSourceInner::new(index, reader, object));
        state.sources[index] = Some(Arc::clone(&inner));
        log::debug!("spatial source {index} created");
        drop(state);
        Some(ObjectSourceHandle::new(inner, writer, Arc::clone(self)))
    }

    /// Host-side liveness ping, called from every process callback. Resets
    /// stop detection and restarts the stream and pump after a quiescent
    /// stop.
    pub fn on_host_process(&self) {
        self.passes_since_host_tick.store(0, Ordering::Relaxed);
        let mut state = self.lock();
        if state.activated && !state.streaming {
            if let Some(stream) = state.stream.as_mut() {
                match stream.start() {
                    Ok(()) => {
                        state.streaming = true;
                        self.pump.start();
                        log::debug!("spatial stream started");
                    }
                    Err(e) => log::warn!("spatial stream start failed: {e}"),
                }
            }
        }
    }

    /// Stop streaming and the pump; activation and sources stay
    fn reset_locked(&self, state: &mut AdapterState) {
        if let Some(stream) = state.stream.as_mut() {
            if let Err(e) = stream.stop() {
                log::warn!("spatial stream stop failed: {e}");
            }
        }
        state.streaming = false;
        self.pump.stop();
        self.passes_since_host_tick.store(0, Ordering::Relaxed);
    }

    /// Default-render-device change: tear the stream down, reactivate on
    /// the new device and rebind every live source with a cleared ring.
    pub fn handle_device_change(&self, new_device_id: &str) -> SpatialResult<()> {
        let mut state = self.lock();
        if state.activated && state.device_id == new_device_id {
            return Ok(());
        }
        self.reset_locked(&mut state);
        state.stream = None;
        state.activated = false;

        let stream = state.client.activate(new_device_id)?;
        state.stream = Some(stream);
        state.device_id = new_device_id.to_string();
        state.activated = true;

        let st = &mut *state;
        let stream = st.stream.as_mut().ok_or(crate::error::SpatialError::Inactive)?;
        for slot in st.sources.iter() {
            let Some(inner) = slot else { continue };
            if !inner.is_active() {
                continue;
            }
            let object = stream.activate_object()?;
            inner.set_object(object);
            inner.clear_buffering();
        }
        log::info!("rebound spatial sources to device '{new_device_id}'");
        Ok(())
    }

    /// One pump pass: stop detection, pruning, then a bracketed update of
    /// every live object.
    pub(crate) fn worker_pass(&self) {
        let passes = self.passes_since_host_tick.fetch_add(1, Ordering::Relaxed) + 1;
        if passes > MAX_PUMP_PASSES_PER_HOST_TICK {
            log::debug!("host stopped feeding audio, quiescing spatial stream");
            let mut state = self.lock();
            self.reset_locked(&mut state);
            return;
        }

        let mut state = self.lock();
        for slot in state.sources.iter_mut() {
            if slot.as_ref().is_some_and(|inner| !inner.is_active()) {
                log::debug!("pruning released spatial source");
                *slot = None;
            }
        }
        if !state.streaming {
            return;
        }
        let st = &mut *state;
        let Some(stream) = st.stream.as_mut() else {
            return;
        };
        if let Err(e) = stream.begin_update() {
            log::warn!("begin_update failed: {e}");
            return;
        }
        for inner in st.sources.iter().flatten() {
            Self::update_object(inner);
        }
        if let Err(e) = stream.end_update() {
            log::warn!("end_update failed: {e}");
        }
    }

    /// Service one object: drain the ring when the preroll gate allows,
    /// silence otherwise. Per-object failures never abort the pass.
    fn update_object(inner: &Arc<ObjectSourceInner>) {
        inner.with_object(|object| {
            let required = object.buffer().len();
            if required > 0 && inner.has_enough_buffered(required) {
                let params = inner.parameters();
                object.set_position(params.primary_arrival_direction);
                object.set_volume(db_to_amplitude(params.primary_arrival_distance_power_db));
                inner.read_into(object.buffer());
            } else {
                object.buffer().fill(0.0);
            }
        });
    }

    pub fn is_streaming(&self) -> bool {
        self.lock().streaming
    }

    pub fn live_source_count(&self) -> usize {
        self.lock().sources.iter().flatten().count()
    }

    pub fn device_id(&self) -> String {
        self.lock().device_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpatialError;
    use crate::objects::source::ObjectSourceParams;
    use crate::objects::stream::SpatialObject;
    use crate::types::{DspVec, PREROLL_BUFFERS, QUANTUM};
    use std::sync::atomic::AtomicUsize;

    const PAGE: usize = 480; // 10 ms of mono at 48 kHz

    #[derive(Default)]
    struct FakeObjectState {
        position: Mutex<DspVec>,
        volume: Mutex<f32>,
        page: Mutex<Vec<f32>>,
        generation: usize,
    }

    struct FakeObject {
        state: Arc<FakeObjectState>,
        page: Vec<f32>,
    }

    impl SpatialObject for FakeObject {
        fn set_position(&mut self, position: DspVec) {
            *self.state.position.lock().unwrap() = position;
        }
        fn set_volume(&mut self, amplitude: f32) {
            *self.state.volume.lock().unwrap() = amplitude;
        }
        fn buffer(&mut self) -> &mut [f32] {
            &mut self.page
        }
    }

    impl Drop for FakeObject {
        fn drop(&mut self) {
            *self.state.page.lock().unwrap() = self.page.clone();
        }
    }

    struct FakeStream {
        objects: Arc<Mutex<Vec<Arc<FakeObjectState>>>>,
        generation: usize,
        started: Arc<AtomicUsize>,
        stopped: Arc<AtomicUsize>,
    }

    impl SpatialRenderStream for FakeStream {
        fn activate_object(&mut self) -> SpatialResult<Box<dyn SpatialObject>> {
            let state = Arc::new(FakeObjectState {
                generation: self.generation,
                ..Default::default()
            });
            self.objects.lock().unwrap().push(Arc::clone(&state));
            Ok(Box::new(FakeObject { state, page: vec![9.9; PAGE] }))
        }
        fn begin_update(&mut self) -> SpatialResult<()> {
            Ok(())
        }
        fn end_update(&mut self) -> SpatialResult<()> {
            Ok(())
        }
        fn start(&mut self) -> SpatialResult<()> {
            self.started.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        fn stop(&mut self) -> SpatialResult<()> {
            self.stopped.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        fn max_objects(&self) -> usize {
            MAX_SOURCES
        }
    }

    struct FakeClient {
        device: String,
        objects: Arc<Mutex<Vec<Arc<FakeObjectState>>>>,
        activations: usize,
        fail: bool,
        started: Arc<AtomicUsize>,
        stopped: Arc<AtomicUsize>,
    }

    impl FakeClient {
        fn new() -> Self {
            Self {
                device: "speakers-1".into(),
                objects: Arc::new(Mutex::new(Vec::new())),
                activations: 0,
                fail: false,
                started: Arc::new(AtomicUsize::new(0)),
                stopped: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl SpatialAudioClient for FakeClient {
        fn default_device_id(&self) -> String {
            self.device.clone()
        }
        fn activate(&mut self, _device_id: &str) -> SpatialResult<Box<dyn SpatialRenderStream>> {
            if self.fail {
                return Err(SpatialError::Activation("no spatial support".into()));
            }
            self.activations += 1;
            Ok(Box::new(FakeStream {
                objects: Arc::clone(&self.objects),
                generation: self.activations,
                started: Arc::clone(&self.started),
                stopped: Arc::clone(&self.stopped),
            }))
        }
    }

    // Long pump period so only the manual worker_pass calls run
    fn adapter_with_fake() -> (Arc<ObjectAdapter>, Arc<Mutex<Vec<Arc<FakeObjectState>>>>) {
        let client = FakeClient::new();
        let objects = Arc::clone(&client.objects);
        let adapter = ObjectAdapter::with_pump_period(Box::new(client), Duration::from_secs(3600));
        (adapter, objects)
    }

    fn feed(handle: &mut ObjectSourceHandle, samples: usize, value: f32) {
        let mut remaining = samples;
        while remaining > 0 {
            let n = remaining.min(QUANTUM);
            handle.buffer()[..n].fill(value);
            handle.commit(n);
            remaining -= n;
        }
    }

    #[test]
    fn test_activation_failure_yields_no_source() {
        let mut client = FakeClient::new();
        client.fail = true;
        let adapter = ObjectAdapter::with_pump_period(Box::new(client), Duration::from_secs(3600));
        assert!(adapter.get_source().is_none());
        assert!(!adapter.is_streaming());
    }

    #[test]
    fn test_source_lifecycle_and_prune() {
        let (adapter, _objects) = adapter_with_fake();
        let handle = adapter.get_source().unwrap();
        assert_eq!(handle.index(), 0);
        assert_eq!(adapter.live_source_count(), 1);
        drop(handle);
        // Deletion is deferred to the next pump pass
        assert_eq!(adapter.live_source_count(), 1);
        adapter.worker_pass();
        assert_eq!(adapter.live_source_count(), 0);
    }

    #[test]
    fn test_preroll_then_drain() {
        let (adapter, objects) = adapter_with_fake();
        let mut handle = adapter.get_source().unwrap();
        handle.set_parameters(ObjectSourceParams {
            primary_arrival_direction: DspVec::new(0.0, 1.0, 0.0),
            primary_arrival_distance_power_db: -6.0,
        });
        // buffer() pings the adapter, which starts stream and pump
        feed(&mut handle, PAGE, 0.25);
        assert!(adapter.is_streaming());

        // Below preroll: the pass writes silence
        adapter.worker_pass();
        {
            let objs = objects.lock().unwrap();
            let obj = &objs[0];
            assert_eq!(*obj.volume.lock().unwrap(), 0.0);
        }

        // Cross the preroll threshold and pump again
        adapter.on_host_process();
        feed(&mut handle, PAGE * PREROLL_BUFFERS, 0.25);
        adapter.worker_pass();
        {
            let objs = objects.lock().unwrap();
            let obj = &objs[0];
            assert!((*obj.volume.lock().unwrap() - db_to_amplitude(-6.0)).abs() < 1e-6);
            assert_eq!(*obj.position.lock().unwrap(), DspVec::new(0.0, 1.0, 0.0));
        }
    }

    #[test]
    fn test_quiescent_stop_after_missed_host_ticks() {
        let (adapter, _objects) = adapter_with_fake();
        let mut handle = adapter.get_source().unwrap();
        feed(&mut handle, PAGE, 0.1);
        assert!(adapter.is_streaming());

        for _ in 0..MAX_PUMP_PASSES_PER_HOST_TICK {
            adapter.worker_pass();
            assert!(adapter.is_streaming());
        }
        // One pass past the limit stops the stream
        adapter.worker_pass();
        assert!(!adapter.is_streaming());
        assert!(!adapter.pump.is_running());

        // The next host tick resumes
        handle.buffer();
        assert!(adapter.is_streaming());
    }

    #[test]
    fn test_device_change_rebinds_live_sources() {
        let (adapter, objects) = adapter_with_fake();
        let mut handles: Vec<ObjectSourceHandle> =
            (0..5).map(|_| adapter.get_source().unwrap()).collect();
        for handle in handles.iter_mut() {
            feed(handle, PAGE * (PREROLL_BUFFERS + 1), 0.5);
        }
        assert_eq!(objects.lock().unwrap().len(), 5);

        adapter.handle_device_change("headphones-2").unwrap();
        assert_eq!(adapter.device_id(), "headphones-2");
        // Five fresh objects on the new stream
        let objs = objects.lock().unwrap();
        assert_eq!(objs.len(), 10);
        assert!(objs[5..].iter().all(|o| o.generation == 2));
        drop(objs);
        // Rings were cleared: a pass right after the change renders silence
        adapter.on_host_process();
        for handle in &handles {
            assert_eq!(handle.inner.buffered_samples(), 0);
        }
        // Same-device notifications are ignored
        adapter.handle_device_change("headphones-2").unwrap();
        assert_eq!(objects.lock().unwrap().len(), 10);
    }

    #[test]
    fn test_drained_samples_reach_object_page() {
        let (adapter, objects) = adapter_with_fake();
        let mut handle = adapter.get_source().unwrap();
        feed(&mut handle, PAGE * (PREROLL_BUFFERS + 1), 0.25);
        adapter.worker_pass();
        drop(handle);
        adapter.worker_pass(); // prune drops the object, snapshotting its page
        let objs = objects.lock().unwrap();
        let page = objs[0].page.lock().unwrap();
        assert_eq!(page.len(), PAGE);
        assert!(page.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }
}
