//! Tick counting shared between interrupt context and the control loop.
//!
//! The interrupt handler only increments. The control loop only reads and
//! resets. Both go through [`TickCounter`], which is atomic so a read can never
//! observe a torn value regardless of the counter width the target supports.
//!
//! A reset racing with an increment may lose that one increment. Callers only
//! rely on monotonic progress towards a threshold, never on exact equality.

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use crate::env::{TickHandler, Timer};

/// Tick count. One tick is one timer period.
pub type Ticks = u32;

/// Counter incremented once per timer interrupt.
///
/// No mutable access is exposed: the interrupt side increments through
/// [`TickHandler::on_tick`], the owning [`TickClock`] reads and resets.
#[derive(Debug, Default)]
pub struct TickCounter {
    count: AtomicU32,
}

impl TickCounter {
    /// Create a counter at zero.
    pub const fn new() -> Self {
        Self { count: AtomicU32::new(0) }
    }

    /// Ticks counted since the last reset.
    pub fn current(&self) -> Ticks {
        self.count.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Release);
    }
}

impl TickHandler for TickCounter {
    fn on_tick(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }
}

/// Per-node tick source: a timer plus the counter its interrupt feeds.
///
/// Lifecycle of every timed operation is `arm` → `wait_until`* → `disarm`,
/// so no stale count leaks from one operation into the next.
pub struct TickClock<T> {
    timer: T,
    counter: Arc<TickCounter>,
    armed: bool,
}

impl<T: Timer> TickClock<T> {
    /// Take ownership of a timer and register the tick counter as its
    /// interrupt handler.
    pub fn new(mut timer: T) -> Self {
        let counter = Arc::new(TickCounter::new());
        timer.set_handler(Arc::clone(&counter) as Arc<dyn TickHandler>);
        Self { timer, counter, armed: false }
    }

    /// Zero the counter and start the timer.
    ///
    /// If the timer fails to start the clock stays disarmed, so later waits
    /// return at once instead of spinning on a counter that never moves.
    pub fn arm(&mut self) {
        self.counter.reset();
        self.armed = self.timer.start();
        if !self.armed {
            tracing::error!("tick timer failed to start");
        }
    }

    /// Stop the timer and zero the counter.
    pub fn disarm(&mut self) {
        self.timer.stop();
        self.counter.reset();
        self.armed = false;
    }

    /// Whether the timer is running.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Ticks since the clock was armed.
    pub fn current_ticks(&self) -> Ticks {
        self.counter.current()
    }

    /// Block until at least `threshold` ticks have elapsed since arming.
    ///
    /// A disarmed clock never advances, so waiting on one returns at once.
    pub fn wait_until(&mut self, threshold: Ticks) {
        if !self.armed {
            tracing::warn!(threshold, "wait on a disarmed tick clock");
            return;
        }

        while self.counter.current() < threshold {
            self.timer.idle();
        }
    }

    /// The underlying timer.
    pub fn timer(&self) -> &T {
        &self.timer
    }
}
