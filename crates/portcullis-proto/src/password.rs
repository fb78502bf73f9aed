//! Password digits and their byte encoding.
//!
//! The same encoding is used on the wire and in the back node's store, so a
//! stored credential can be compared byte for byte against a received one.

use crate::{ProtocolError, ZERO_SENTINEL};

/// Number of digits in a password.
pub const PASSWORD_LEN: usize = 5;

/// A single decimal digit (0..=9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digit(u8);

impl Digit {
    /// The digit 0.
    pub const ZERO: Self = Self(0);

    /// Create a digit. `None` unless `value <= 9`.
    pub const fn new(value: u8) -> Option<Self> {
        if value <= 9 { Some(Self(value)) } else { None }
    }

    /// Numeric value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Byte used on the wire and in the store.
    ///
    /// 0 maps to [`ZERO_SENTINEL`]; every other digit is its own value.
    pub const fn encode(self) -> u8 {
        if self.0 == 0 { ZERO_SENTINEL } else { self.0 }
    }

    /// Inverse of [`Digit::encode`].
    pub const fn decode(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            ZERO_SENTINEL => Ok(Self(0)),
            1..=9 => Ok(Self(byte)),
            _ => Err(ProtocolError::InvalidDigit(byte)),
        }
    }
}

impl std::fmt::Display for Digit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Five-digit numeric password.
///
/// # Security
///
/// - **Debug Redaction**: the `Debug` impl never prints the digits, so a
///   password can travel through `tracing` fields without leaking.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Password([Digit; PASSWORD_LEN]);

impl Password {
    /// Build from raw digit values. `None` if any value is above 9.
    pub fn new(values: [u8; PASSWORD_LEN]) -> Option<Self> {
        let mut digits = [Digit(0); PASSWORD_LEN];
        for (slot, value) in digits.iter_mut().zip(values) {
            *slot = Digit::new(value)?;
        }
        Some(Self(digits))
    }

    /// Build from already validated digits.
    pub const fn from_digits(digits: [Digit; PASSWORD_LEN]) -> Self {
        Self(digits)
    }

    /// Decode from encoded bytes (wire or store representation).
    pub fn decode(bytes: [u8; PASSWORD_LEN]) -> Result<Self, ProtocolError> {
        let mut digits = [Digit(0); PASSWORD_LEN];
        for (slot, byte) in digits.iter_mut().zip(bytes) {
            *slot = Digit::decode(byte)?;
        }
        Ok(Self(digits))
    }

    /// Digits in entry order.
    pub const fn digits(&self) -> &[Digit; PASSWORD_LEN] {
        &self.0
    }

    /// Encoded bytes in entry order, without terminator.
    pub fn encoded(&self) -> [u8; PASSWORD_LEN] {
        self.0.map(Digit::encode)
    }

    /// Raw digit values.
    pub fn values(&self) -> [u8; PASSWORD_LEN] {
        self.0.map(Digit::value)
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&format_args!("<redacted {PASSWORD_LEN} digits>")).finish()
    }
}
