//! Simulated tick source.
//!
//! `SimTimer` delivers exactly one tick each time the control core idles while
//! the timer is started. Nothing happens between idles, so a full door cycle
//! or alarm window completes instantly and tick-exact, independent of wall
//! clock and thread scheduling.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
};

use portcullis_core::{TickHandler, Timer};

#[derive(Default)]
struct SimTimerState {
    handler: Mutex<Option<Arc<dyn TickHandler>>>,
    running: AtomicBool,
    now: AtomicU64,
    starts: AtomicU32,
}

/// Deterministic timer.
///
/// Clones share state, so a test (or [`crate::RecordingActuators`]) can read
/// simulated time while a node owns the timer.
#[derive(Clone, Default)]
pub struct SimTimer {
    state: Arc<SimTimerState>,
}

impl SimTimer {
    /// Stopped timer at simulated time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks delivered since creation. Never resets.
    pub fn now(&self) -> u64 {
        self.state.now.load(Ordering::Acquire)
    }

    /// Whether the timer is started.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// How many times the timer has been started.
    pub fn starts(&self) -> u32 {
        self.state.starts.load(Ordering::Acquire)
    }
}

impl Timer for SimTimer {
    fn set_handler(&mut self, handler: Arc<dyn TickHandler>) {
        *self.state.handler.lock().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    fn start(&mut self) -> bool {
        self.state.starts.fetch_add(1, Ordering::AcqRel);
        self.state.running.store(true, Ordering::Release);
        true
    }

    fn stop(&mut self) {
        self.state.running.store(false, Ordering::Release);
    }

    fn idle(&mut self) {
        if !self.is_running() {
            return;
        }

        let handler = self.state.handler.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(handler) = handler {
            handler.on_tick();
            self.state.now.fetch_add(1, Ordering::AcqRel);
        }
    }
}
