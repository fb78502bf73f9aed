//! Logged stand-ins for the motor driver and buzzer.

use std::sync::{Arc, Mutex, PoisonError};

use portcullis_core::{Actuators, MotorDirection};

/// One actuator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorEvent {
    /// Motor driven in a direction.
    Motor(MotorDirection),
    /// Buzzer switched.
    Alarm(bool),
}

/// Actuators that log every command and keep a journal.
///
/// Clones share the journal.
#[derive(Clone, Default)]
pub struct LoggingActuators {
    journal: Arc<Mutex<Vec<ActuatorEvent>>>,
}

impl LoggingActuators {
    /// Empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command issued so far, oldest first.
    pub fn events(&self) -> Vec<ActuatorEvent> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, event: ActuatorEvent) {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

impl Actuators for LoggingActuators {
    fn set_motor(&mut self, direction: MotorDirection) {
        tracing::info!(?direction, "motor");
        self.record(ActuatorEvent::Motor(direction));
    }

    fn set_alarm(&mut self, on: bool) {
        if on {
            tracing::warn!("buzzer on");
        } else {
            tracing::info!("buzzer off");
        }
        self.record(ActuatorEvent::Alarm(on));
    }
}
