//! Ticker-driven render pump
//!
//! Stands in for the OS real-time work queue: one thread woken every
//! ~10 ms by a crossbeam ticker. The pass closure only runs while the
//! pump is started, so stop/start is a flag flip rather than a thread
//! teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{bounded, tick, Sender};

/// Pump pass cadence
pub const PUMP_PERIOD: Duration = Duration::from_millis(10);

pub(crate) struct Pump {
    running: Arc<AtomicBool>,
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl Pump {
    /// Spawn the worker thread. `pass` runs once per period while started.
    pub(crate) fn spawn<F>(period: Duration, pass: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(false));
        let (shutdown, shutdown_rx) = bounded::<()>(1);
        let thread_running = Arc::clone(&running);
        let thread = std::thread::spawn(move || {
            let ticker = tick(period);
            loop {
                crossbeam::select! {
                    recv(ticker) -> _ => {
                        if thread_running.load(Ordering::Acquire) {
                            pass();
                        }
                    }
                    recv(shutdown_rx) -> _ => break,
                }
            }
        });
        Self {
            running,
            shutdown,
            thread: Some(thread),
        }
    }

    pub(crate) fn start(&self) {
        self.running.store(true, Ordering::Release);
    }

    pub(crate) fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
