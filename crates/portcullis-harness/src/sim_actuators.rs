//! Actuators that timestamp every command with simulated time.

use std::sync::{Arc, Mutex, PoisonError};

use portcullis_core::{Actuators, MotorDirection};
use portcullis_host::ActuatorEvent;

use crate::SimTimer;

/// Actuator command with the simulated tick it was issued at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    /// [`SimTimer::now`] of the back node's timer.
    pub at: u64,
    /// Command issued.
    pub event: ActuatorEvent,
}

/// Journal of motor and buzzer commands on the back node's time line.
///
/// Clones share the journal.
#[derive(Clone)]
pub struct RecordingActuators {
    clock: SimTimer,
    journal: Arc<Mutex<Vec<TimedEvent>>>,
}

impl RecordingActuators {
    /// Record against `clock`, which should be the back node's timer.
    pub fn new(clock: SimTimer) -> Self {
        Self { clock, journal: Arc::default() }
    }

    /// Every command, oldest first.
    pub fn events(&self) -> Vec<TimedEvent> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Commands without timestamps.
    pub fn commands(&self) -> Vec<ActuatorEvent> {
        self.events().into_iter().map(|e| e.event).collect()
    }

    /// Drain the journal.
    pub fn take_events(&self) -> Vec<TimedEvent> {
        std::mem::take(&mut *self.journal.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn record(&self, event: ActuatorEvent) {
        let at = self.clock.now();
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).push(TimedEvent { at, event });
    }
}

impl Actuators for RecordingActuators {
    fn set_motor(&mut self, direction: MotorDirection) {
        self.record(ActuatorEvent::Motor(direction));
    }

    fn set_alarm(&mut self, on: bool) {
        self.record(ActuatorEvent::Alarm(on));
    }
}
