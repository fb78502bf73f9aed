//! Operations for model-based testing.
//!
//! Operations are whole user interactions at the keypad. They are generated
//! randomly and applied to both the model and the simulated appliance.

use arbitrary::Arbitrary;
use portcullis_proto::{Digit, PASSWORD_LEN, Password};

/// Password as generated: any bytes, folded into digits on use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct ModelPassword {
    /// Raw values; each is taken modulo 10.
    pub raw: [u8; PASSWORD_LEN],
}

impl ModelPassword {
    /// Digit values.
    pub fn digits(&self) -> [u8; PASSWORD_LEN] {
        self.raw.map(|v| v % 10)
    }

    /// The same password with one digit changed.
    pub fn perturbed(&self, position: u8) -> Self {
        let mut raw = self.digits();
        let i = usize::from(position) % PASSWORD_LEN;
        raw[i] = (raw[i] + 1) % 10;
        Self { raw }
    }

    /// As a real password.
    pub fn to_password(&self) -> Password {
        Password::from_digits(self.digits().map(|v| Digit::new(v).unwrap_or(Digit::ZERO)))
    }

    /// Keypad keys entering this password.
    pub fn keys(&self) -> String {
        self.digits().iter().map(|v| char::from(b'0' + v)).collect()
    }
}

/// Password typed when the system asks for the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Guess {
    /// Whatever is currently stored.
    Correct,
    /// The stored password with one digit changed.
    OffByOne {
        /// Position changed, modulo the password length.
        position: u8,
    },
    /// An arbitrary password, which may happen to be correct.
    Random(ModelPassword),
}

/// A user interaction at the keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Enter a password and its confirmation.
    Provision {
        /// First entry.
        password: ModelPassword,
        /// Whether the confirmation repeats it exactly.
        confirm: bool,
    },
    /// `+` then a password.
    OpenDoor {
        /// Password typed.
        guess: Guess,
    },
    /// `-` then a password, then the replacement on success.
    ChangePassword {
        /// Password typed.
        guess: Guess,
        /// Replacement entered after a match.
        replacement: ModelPassword,
    },
    /// A menu key that is neither `+` nor `-`.
    PressOther {
        /// Picks the key.
        selector: u8,
    },
}

impl Operation {
    /// Key a [`Operation::PressOther`] selector maps to.
    pub fn other_key(selector: u8) -> char {
        const KEYS: [char; 12] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '*', '#'];
        KEYS[usize::from(selector) % KEYS.len()]
    }
}

/// Observable result of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation does not apply in the current state and was not performed.
    NotApplicable,
    /// Confirmation mismatched; still awaiting setup.
    SetupRetry,
    /// Password provisioned.
    SetupComplete,
    /// Menu key ignored.
    Ignored,
    /// Wrong password below the alarm threshold.
    WrongPassword {
        /// Consecutive failures.
        attempts: u8,
    },
    /// Door cycled.
    DoorCycled,
    /// Password replaced.
    PasswordChanged,
    /// Alarm sounded.
    Alarm,
}
