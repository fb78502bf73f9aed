//! Deterministic simulation harness for the Portcullis appliance.
//!
//! Simulated peripherals for both nodes: a timer that ticks only when a node
//! idles, a scripted keypad that records the display, an actuator journal
//! stamped in ticks and an EEPROM that fails on demand. [`SimAppliance`] wires
//! them to the real node logic over an in-process link.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the simulated
//! appliance, and their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chaotic_eeprom;
pub mod model;
pub mod sim_actuators;
pub mod sim_appliance;
pub mod sim_panel;
pub mod sim_timer;

pub use chaotic_eeprom::ChaoticEeprom;
pub use model::{
    Guess, ModelAppliance, ModelPassword, ObservableState, Operation, OperationResult,
};
pub use sim_actuators::{RecordingActuators, TimedEvent};
pub use sim_appliance::{BackShutdown, LINK_TIMEOUT, SimAppliance, SimBack, SimFront, keys_for};
pub use sim_panel::ScriptedPanel;
pub use sim_timer::SimTimer;
