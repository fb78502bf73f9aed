//! Real-time tick source backed by an OS thread.
//!
//! `ThreadTimer` stands in for the hardware overflow interrupt: while started,
//! a worker thread sleeps one period and calls the registered handler, so the
//! control core sees ticks arrive asynchronously exactly as it would on the
//! target.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use portcullis_core::{TickHandler, Timer};

/// Periodic timer running its interrupt handler on a worker thread.
///
/// Dropping the timer stops the worker.
pub struct ThreadTimer {
    period: Duration,
    handler: Option<Arc<dyn TickHandler>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    /// Create a stopped timer with the given period.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self { period, handler: None, running: Arc::new(AtomicBool::new(false)), worker: None }
    }

    /// Tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether the worker is delivering ticks.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Timer for ThreadTimer {
    fn set_handler(&mut self, handler: Arc<dyn TickHandler>) {
        self.handler = Some(handler);
    }

    fn start(&mut self) -> bool {
        self.stop();

        let Some(handler) = self.handler.clone() else {
            tracing::warn!("timer started without a tick handler");
            return false;
        };

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let period = self.period;

        let spawned = thread::Builder::new().name("portcullis-tick".into()).spawn(move || {
            while running.load(Ordering::Acquire) {
                thread::sleep(period);
                if running.load(Ordering::Acquire) {
                    handler.on_tick();
                }
            }
        });

        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                true
            },
            Err(e) => {
                tracing::error!("failed to spawn tick thread: {}", e);
                self.running.store(false, Ordering::Release);
                false
            },
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("tick thread panicked");
        }
    }

    fn idle(&mut self) {
        thread::sleep(self.period / 4);
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
