//! Reference model for model-based testing.
//!
//! The model is a plain-data rendition of the appliance's observable
//! behaviour: which password is stored, how many wrong attempts are pending,
//! how many door cycles and alarms have happened. It has no timers, no link
//! and no threads, and serves as the oracle the simulated appliance is checked
//! against.
//!
//! # Design Principles
//!
//! - Simplicity: the model should be obviously correct
//! - Behaviour not mechanism: captures what the user observes
//! - Deterministic: same operations produce the same state

pub mod operation;
mod world;

pub use operation::{Guess, ModelPassword, Operation, OperationResult};
pub use world::{ModelAppliance, ObservableState};
