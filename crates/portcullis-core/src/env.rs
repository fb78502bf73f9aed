//! Peripheral abstraction for deterministic testing.
//!
//! The control cores never touch hardware directly. Every peripheral they
//! consume is a trait defined here, which enables:
//!
//! - Deterministic Simulation: a simulated timer delivers ticks only when the
//!   core is idle-waiting, so door and alarm timing can be checked tick by
//!   tick without wall-clock delay.
//!
//! - Production Runtime: real timers, UART links and EEPROM drivers implement
//!   the same traits without any change to the control logic.
//!
//! # Invariants
//!
//! - A [`Timer`] delivers ticks only between `start` and `stop`.
//! - [`Eeprom::settle`] is called after every write, and implementations must
//!   not accept the next operation before the write cycle completes.
//! - [`Panel::read_key`] and [`crate::SerialChannel::receive_byte`] block;
//!   there is no timeout in the protocol.

use std::{sync::Arc, time::Duration};

use portcullis_proto::Digit;

use crate::error::{PanelError, StoreError};

/// Interrupt-context tick callback.
///
/// Registered once with a [`Timer`] at initialization and invoked once per
/// timer period while the timer runs.
pub trait TickHandler: Send + Sync {
    /// Called from interrupt context on every timer period.
    fn on_tick(&self);
}

/// Periodic hardware timer.
pub trait Timer {
    /// Register the interrupt callback. Called exactly once, before `start`.
    fn set_handler(&mut self, handler: Arc<dyn TickHandler>);

    /// Start delivering ticks. Returns `false` if the timer could not start.
    fn start(&mut self) -> bool;

    /// Stop delivering ticks.
    fn stop(&mut self);

    /// Called between polls while the control core waits on a tick threshold.
    ///
    /// Hardware timers spin here. Simulated timers deliver the next tick.
    fn idle(&mut self) {
        std::hint::spin_loop();
    }
}

/// Byte-addressed non-volatile memory.
pub trait Eeprom {
    /// Read one byte.
    fn read_byte(&mut self, address: u16) -> Result<u8, StoreError>;

    /// Write one byte. The caller settles before the next operation.
    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), StoreError>;

    /// Wait out the device's access cycle.
    fn settle(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Key reported by the keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Numeric key.
    Digit(Digit),
    /// `+`: open the door.
    Plus,
    /// `-`: change the password.
    Minus,
    /// Any other key.
    Other(char),
}

impl Key {
    /// Map a keypad legend to a key.
    pub fn from_char(c: char) -> Self {
        match c {
            '+' => Self::Plus,
            '-' => Self::Minus,
            _ => c
                .to_digit(10)
                .and_then(|d| u8::try_from(d).ok())
                .and_then(Digit::new)
                .map_or(Self::Other(c), Self::Digit),
        }
    }
}

/// Keypad and character display of the front node.
pub trait Panel {
    /// Clear the display and home the cursor.
    fn clear(&mut self);

    /// Write text at the cursor.
    fn display_text(&mut self, text: &str);

    /// Write text at a row and column.
    fn display_text_at(&mut self, row: u8, col: u8, text: &str);

    /// Block until a key is pressed.
    fn read_key(&mut self) -> Result<Key, PanelError>;

    /// Keep the current screen for a while.
    fn hold(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Direction of the lock motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MotorDirection {
    /// Motor de-energized.
    #[default]
    Stop,
    /// Clockwise, opening the door.
    Open,
    /// Counter-clockwise, closing the door.
    Close,
}

/// Motor and buzzer of the back node.
pub trait Actuators {
    /// Drive the lock motor.
    fn set_motor(&mut self, direction: MotorDirection);

    /// Switch the alarm buzzer.
    fn set_alarm(&mut self, on: bool);
}
