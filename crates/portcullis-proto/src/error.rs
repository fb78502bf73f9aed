//! Protocol error types.

use thiserror::Error;

/// Errors from decoding bytes received off the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Byte is not one of the defined opcodes.
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// Byte is not a valid digit encoding.
    #[error("invalid digit byte: {0:#04x}")]
    InvalidDigit(u8),

    /// Terminator arrived after the wrong number of digit bytes.
    #[error("digit sequence has {len} digits, expected {expected}")]
    WrongLength {
        /// Digit bytes seen before the terminator.
        len: usize,
        /// Required digit count.
        expected: usize,
    },
}
