//! Model appliance: the oracle.

use portcullis_core::ALARM_THRESHOLD;
use portcullis_proto::PASSWORD_LEN;

use super::operation::{Guess, ModelPassword, Operation, OperationResult};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Whether setup has completed.
    pub provisioned: bool,
    /// Digits the back node holds, if any were ever stored.
    pub stored: Option<[u8; PASSWORD_LEN]>,
    /// Consecutive wrong passwords pending on the front node.
    pub wrong_attempts: u8,
    /// Completed door cycles.
    pub door_cycles: u32,
    /// Alarm windows run.
    pub alarms: u32,
}

/// Reference implementation of the appliance's user-visible behaviour.
#[derive(Debug, Clone)]
pub struct ModelAppliance {
    state: ObservableState,
    threshold: u8,
}

impl Default for ModelAppliance {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelAppliance {
    /// Unprovisioned appliance with the default alarm threshold.
    pub fn new() -> Self {
        Self {
            state: ObservableState {
                provisioned: false,
                stored: None,
                wrong_attempts: 0,
                door_cycles: 0,
                alarms: 0,
            },
            threshold: ALARM_THRESHOLD,
        }
    }

    /// Keys a user would type to perform `op`. `None` if it does not apply.
    pub fn keys_for(&self, op: &Operation) -> Option<String> {
        match *op {
            Operation::Provision { password, confirm } => {
                if self.state.provisioned {
                    return None;
                }
                let confirmation = if confirm { password } else { password.perturbed(0) };
                Some(format!("{}{}", password.keys(), confirmation.keys()))
            },
            Operation::OpenDoor { guess } => {
                let typed = self.typed(guess)?;
                Some(format!("+{}", typed.keys()))
            },
            Operation::ChangePassword { guess, replacement } => {
                let typed = self.typed(guess)?;
                let mut keys = format!("-{}", typed.keys());
                if self.state.stored == Some(typed.digits()) {
                    keys.push_str(&replacement.keys());
                }
                Some(keys)
            },
            Operation::PressOther { selector } => {
                self.state.provisioned.then(|| Operation::other_key(selector).to_string())
            },
        }
    }

    /// Apply an operation and return the result the user would observe.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match *op {
            Operation::Provision { password, confirm } => {
                if self.state.provisioned {
                    return OperationResult::NotApplicable;
                }
                self.state.stored = Some(password.digits());
                if confirm {
                    self.state.provisioned = true;
                    OperationResult::SetupComplete
                } else {
                    OperationResult::SetupRetry
                }
            },
            Operation::OpenDoor { guess } => match self.verify(guess) {
                None => OperationResult::NotApplicable,
                Some(true) => {
                    self.state.door_cycles += 1;
                    OperationResult::DoorCycled
                },
                Some(false) => self.wrong_password(),
            },
            Operation::ChangePassword { guess, replacement } => match self.verify(guess) {
                None => OperationResult::NotApplicable,
                Some(true) => {
                    self.state.stored = Some(replacement.digits());
                    OperationResult::PasswordChanged
                },
                Some(false) => self.wrong_password(),
            },
            Operation::PressOther { .. } => {
                if self.state.provisioned {
                    OperationResult::Ignored
                } else {
                    OperationResult::NotApplicable
                }
            },
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        self.state.clone()
    }

    fn typed(&self, guess: Guess) -> Option<ModelPassword> {
        if !self.state.provisioned {
            return None;
        }
        let stored = ModelPassword { raw: self.state.stored? };
        Some(match guess {
            Guess::Correct => stored,
            Guess::OffByOne { position } => stored.perturbed(position),
            Guess::Random(password) => password,
        })
    }

    /// `Some(matched)` if verification applies.
    fn verify(&mut self, guess: Guess) -> Option<bool> {
        let typed = self.typed(guess)?;
        let matched = self.state.stored == Some(typed.digits());
        if matched {
            self.state.wrong_attempts = 0;
        }
        Some(matched)
    }

    fn wrong_password(&mut self) -> OperationResult {
        self.state.wrong_attempts += 1;
        if self.state.wrong_attempts >= self.threshold {
            self.state.wrong_attempts = 0;
            self.state.alarms += 1;
            OperationResult::Alarm
        } else {
            OperationResult::WrongPassword { attempts: self.state.wrong_attempts }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pw(raw: [u8; PASSWORD_LEN]) -> ModelPassword {
        ModelPassword { raw }
    }

    #[test]
    fn nothing_but_setup_applies_before_provisioning() {
        let mut model = ModelAppliance::new();
        assert_eq!(
            model.apply(&Operation::OpenDoor { guess: Guess::Correct }),
            OperationResult::NotApplicable
        );
        assert_eq!(
            model.apply(&Operation::Provision { password: pw([1, 2, 3, 4, 5]), confirm: false }),
            OperationResult::SetupRetry
        );
        assert_eq!(model.observable_state().stored, Some([1, 2, 3, 4, 5]));
        assert!(!model.observable_state().provisioned);
    }

    #[test]
    fn third_wrong_guess_alarms() {
        let mut model = ModelAppliance::new();
        model.apply(&Operation::Provision { password: pw([1, 2, 3, 4, 5]), confirm: true });

        let wrong = Operation::OpenDoor { guess: Guess::OffByOne { position: 2 } };
        assert_eq!(model.apply(&wrong), OperationResult::WrongPassword { attempts: 1 });
        assert_eq!(model.apply(&wrong), OperationResult::WrongPassword { attempts: 2 });
        assert_eq!(model.apply(&wrong), OperationResult::Alarm);
        assert_eq!(model.observable_state().wrong_attempts, 0);
        assert_eq!(model.observable_state().alarms, 1);
    }

    #[test]
    fn change_keys_include_replacement_only_on_match() {
        let mut model = ModelAppliance::new();
        model.apply(&Operation::Provision { password: pw([1, 1, 1, 1, 1]), confirm: true });

        let good = Operation::ChangePassword { guess: Guess::Correct, replacement: pw([2; 5]) };
        assert_eq!(model.keys_for(&good).as_deref(), Some("-1111122222"));

        let bad = Operation::ChangePassword {
            guess: Guess::OffByOne { position: 0 },
            replacement: pw([2; 5]),
        };
        assert_eq!(model.keys_for(&bad).as_deref(), Some("-21111"));
    }
}
