//! Portcullis control cores.
//!
//! Hardware-independent logic for both nodes of the door-lock appliance. The
//! cores talk to the world only through the peripheral traits in [`env`] and
//! [`SerialChannel`], so the same code runs against real drivers, host
//! threads, or a deterministic simulation.
//!
//! ## Architecture
//!
//! ```text
//! portcullis-core
//!   ├─ FrontNode        (keypad/display, protocol initiator)
//!   ├─ BackNode         (store/motor/buzzer, protocol responder)
//!   ├─ TickClock        (interrupt-fed tick counter, blocking waits)
//!   ├─ DoorTiming       (tick thresholds of the door sequence)
//!   ├─ AttemptTracker   (wrong-password escalation)
//!   └─ CredentialStore  (EEPROM credential with commit policies)
//! ```
//!
//! Each node is a single thread of control plus one asynchronous source, the
//! timer interrupt feeding its [`TickCounter`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod alarm;
mod back;
mod channel;
mod config;
mod door;
pub mod env;
mod error;
mod front;
mod store;
mod ticks;

pub use alarm::{ALARM_THRESHOLD, ALARM_TICKS, AttemptTracker, Escalation, run_alarm_window};
pub use back::{BackNode, BackOutcome, BackState};
pub use channel::SerialChannel;
pub use config::{ApplianceConfig, TICK_PERIOD};
pub use door::{
    DWELL_TICKS, DoorPhase, DoorTiming, LOCK_TICKS, TIMED_PHASES, UNLOCK_TICKS, run_door_sequence,
};
pub use env::{Actuators, Eeprom, Key, MotorDirection, Panel, TickHandler, Timer};
pub use error::{ChannelError, NodeError, PanelError, StoreError};
pub use front::{FrontNode, FrontOutcome, FrontState, screen};
pub use store::{
    CommitPolicy, CredentialStore, DEFAULT_BASE_ADDRESS, DEFAULT_SETTLE, StoreLayout, Verdict,
};
pub use ticks::{TickClock, TickCounter, Ticks};
