//! Portcullis wire protocol.
//!
//! Byte-level vocabulary shared by the front (keypad) node and the back
//! (actuator) node of the door-lock appliance. The serial link between them is
//! byte-reliable and ordered but carries no framing, so this crate defines it:
//!
//! - Single-byte [`Command`] opcodes for control signalling.
//! - Digit-sequence messages: five encoded password digits followed by
//!   [`TERMINATOR`]. Receivers read until the terminator, never a length
//!   prefix. See [`encode_digit_sequence`] and [`SequenceDecoder`].
//!
//! # Invariants
//!
//! - The terminator is disjoint from every digit encoding.
//! - The digit 0 never appears on the wire as `0x00`; it travels as
//!   [`ZERO_SENTINEL`] so it cannot be mistaken for an end-of-string byte.
//! - Exactly one opcode is outstanding per exchange. Nothing in this crate
//!   pipelines.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod error;
mod password;
mod sequence;

pub use command::Command;
pub use error::ProtocolError;
pub use password::{Digit, PASSWORD_LEN, Password};
pub use sequence::{
    DIGIT_SEQUENCE_LEN, SequenceDecoder, TERMINATOR, ZERO_SENTINEL, encode_digit_sequence,
};
