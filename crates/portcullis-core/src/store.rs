//! Persistent password store on the back node.
//!
//! The credential lives at a fixed base address in byte-addressed EEPROM, in
//! the same encoding used on the wire, so verification is a byte-for-byte
//! comparison.
//!
//! ## Layout
//!
//! ```text
//! InPlace:  base+0..5  credential
//!
//! Staged:   base+0..5   slot 0
//!           base+5..10  slot 1
//!           base+10     active slot selector (0 or 1)
//! ```
//!
//! `InPlace` overwrites the live credential directly; an interrupted change
//! leaves it partially overwritten. `Staged` writes the inactive slot and then
//! flips the selector with a single byte write, so the live credential is
//! never half-written.

use std::time::Duration;

use portcullis_proto::{Command, PASSWORD_LEN, Password};

use crate::{env::Eeprom, error::StoreError};

/// Base address of the credential region.
pub const DEFAULT_BASE_ADDRESS: u16 = 0x0311;

/// Access cycle waited after each store operation.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(10);

const SELECTOR_OFFSET: usize = 2 * PASSWORD_LEN;

/// How a new password replaces the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitPolicy {
    /// Overwrite the single credential region byte by byte.
    InPlace,
    /// Write a staging slot, then commit with one selector byte.
    #[default]
    Staged,
}

/// Where and how the credential is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLayout {
    /// First byte of the credential region.
    pub base_address: u16,
    /// Wait after each byte access.
    pub settle: Duration,
    /// Replacement strategy.
    pub policy: CommitPolicy,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            base_address: DEFAULT_BASE_ADDRESS,
            settle: DEFAULT_SETTLE,
            policy: CommitPolicy::default(),
        }
    }
}

impl StoreLayout {
    /// Bytes of EEPROM the layout occupies.
    pub const fn footprint(&self) -> usize {
        match self.policy {
            CommitPolicy::InPlace => PASSWORD_LEN,
            CommitPolicy::Staged => SELECTOR_OFFSET + 1,
        }
    }

    fn address(&self, offset: usize) -> Result<u16, StoreError> {
        u16::try_from(offset)
            .ok()
            .and_then(|o| self.base_address.checked_add(o))
            .ok_or(StoreError::AddressOutOfRange { base: self.base_address, offset })
    }
}

/// Result of comparing a candidate with the stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Candidate equals the stored password.
    Match,
    /// Candidate differs in at least one digit.
    Mismatch,
}

impl Verdict {
    /// Opcode announcing this verdict.
    pub const fn command(self) -> Command {
        match self {
            Self::Match => Command::Match,
            Self::Mismatch => Command::Mismatch,
        }
    }

    /// Verdict carried by an opcode, if it is one.
    pub const fn from_command(command: Command) -> Option<Self> {
        match command {
            Command::Match => Some(Self::Match),
            Command::Mismatch => Some(Self::Mismatch),
            _ => None,
        }
    }

    /// True for [`Verdict::Match`].
    pub const fn is_match(self) -> bool {
        matches!(self, Self::Match)
    }
}

/// Password store over an EEPROM device.
pub struct CredentialStore<E> {
    eeprom: E,
    layout: StoreLayout,
    active_slot: u8,
}

impl<E: Eeprom> CredentialStore<E> {
    /// Open the store, reading the active slot selector for staged layouts.
    ///
    /// An erased or unrecognised selector means slot 0.
    pub fn open(mut eeprom: E, layout: StoreLayout) -> Result<Self, StoreError> {
        let active_slot = match layout.policy {
            CommitPolicy::InPlace => 0,
            CommitPolicy::Staged => {
                let address = layout.address(SELECTOR_OFFSET)?;
                let selector = eeprom.read_byte(address)?;
                eeprom.settle(layout.settle);
                if selector == 1 { 1 } else { 0 }
            },
        };

        Ok(Self { eeprom, layout, active_slot })
    }

    /// Layout in use.
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Slot holding the live credential (always 0 for `InPlace`).
    pub fn active_slot(&self) -> u8 {
        self.active_slot
    }

    /// The underlying device.
    pub fn eeprom(&self) -> &E {
        &self.eeprom
    }

    /// Compare a candidate with the stored credential.
    ///
    /// Reads stop at the first differing digit, so a candidate that first
    /// differs at position `i` costs `i + 1` reads.
    pub fn verify(&mut self, candidate: &Password) -> Result<Verdict, StoreError> {
        let slot_offset = usize::from(self.active_slot) * PASSWORD_LEN;

        for (i, expected) in candidate.encoded().into_iter().enumerate() {
            let address = self.layout.address(slot_offset + i)?;
            let stored = self.eeprom.read_byte(address)?;
            self.eeprom.settle(self.layout.settle);

            if stored != expected {
                return Ok(Verdict::Mismatch);
            }
        }

        Ok(Verdict::Match)
    }

    /// Replace the stored credential according to the commit policy.
    pub fn store(&mut self, password: &Password) -> Result<(), StoreError> {
        match self.layout.policy {
            CommitPolicy::InPlace => self.write_slot(0, password),
            CommitPolicy::Staged => {
                let staging = 1 - self.active_slot;
                self.write_slot(staging, password)?;

                let selector = self.layout.address(SELECTOR_OFFSET)?;
                self.eeprom.write_byte(selector, staging)?;
                self.eeprom.settle(self.layout.settle);

                self.active_slot = staging;
                Ok(())
            },
        }
    }

    /// Read back the live credential.
    pub fn load(&mut self) -> Result<Password, StoreError> {
        let slot_offset = usize::from(self.active_slot) * PASSWORD_LEN;
        let mut bytes = [0u8; PASSWORD_LEN];

        for (i, byte) in bytes.iter_mut().enumerate() {
            let address = self.layout.address(slot_offset + i)?;
            *byte = self.eeprom.read_byte(address)?;
            self.eeprom.settle(self.layout.settle);
        }

        Password::decode(bytes).map_err(StoreError::Corrupt)
    }

    fn write_slot(&mut self, slot: u8, password: &Password) -> Result<(), StoreError> {
        let slot_offset = usize::from(slot) * PASSWORD_LEN;

        for (i, byte) in password.encoded().into_iter().enumerate() {
            let address = self.layout.address(slot_offset + i)?;
            self.eeprom.write_byte(address, byte)?;
            self.eeprom.settle(self.layout.settle);
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;

    /// Sparse EEPROM that counts accesses and can fail a chosen write.
    #[derive(Default)]
    struct CountingEeprom {
        cells: HashMap<u16, u8>,
        reads: usize,
        writes: usize,
        settles: usize,
        fail_write_at: Option<usize>,
    }

    impl Eeprom for CountingEeprom {
        fn read_byte(&mut self, address: u16) -> Result<u8, StoreError> {
            self.reads += 1;
            Ok(self.cells.get(&address).copied().unwrap_or(0xFF))
        }

        fn write_byte(&mut self, address: u16, value: u8) -> Result<(), StoreError> {
            if self.fail_write_at == Some(self.writes) {
                return Err(StoreError::WriteFailed { address });
            }
            self.writes += 1;
            self.cells.insert(address, value);
            Ok(())
        }

        fn settle(&mut self, _duration: Duration) {
            self.settles += 1;
        }
    }

    fn layout(policy: CommitPolicy) -> StoreLayout {
        StoreLayout { policy, ..StoreLayout::default() }
    }

    fn pw(values: [u8; 5]) -> Password {
        Password::new(values).unwrap()
    }

    #[test]
    fn stored_password_verifies() {
        for policy in [CommitPolicy::InPlace, CommitPolicy::Staged] {
            let mut store =
                CredentialStore::open(CountingEeprom::default(), layout(policy)).unwrap();
            store.store(&pw([1, 2, 3, 4, 5])).unwrap();

            assert_eq!(store.verify(&pw([1, 2, 3, 4, 5])).unwrap(), Verdict::Match);
            assert_eq!(store.verify(&pw([1, 2, 3, 4, 6])).unwrap(), Verdict::Mismatch);
            assert_eq!(store.load().unwrap(), pw([1, 2, 3, 4, 5]));
        }
    }

    #[test]
    fn in_place_writes_at_base_address() {
        let mut store =
            CredentialStore::open(CountingEeprom::default(), layout(CommitPolicy::InPlace))
                .unwrap();
        store.store(&pw([0, 2, 3, 4, 5])).unwrap();

        let cells = &store.eeprom().cells;
        assert_eq!(cells.get(&0x0311), Some(&0xFF));
        assert_eq!(cells.get(&0x0315), Some(&5));
        assert_eq!(store.eeprom().writes, 5);
        assert_eq!(store.eeprom().settles, 5, "settle after every write");
    }

    #[test]
    fn staged_commit_alternates_slots() {
        let mut store =
            CredentialStore::open(CountingEeprom::default(), layout(CommitPolicy::Staged)).unwrap();
        assert_eq!(store.active_slot(), 0);

        store.store(&pw([1, 1, 1, 1, 1])).unwrap();
        assert_eq!(store.active_slot(), 1);
        store.store(&pw([2, 2, 2, 2, 2])).unwrap();
        assert_eq!(store.active_slot(), 0);

        assert_eq!(store.verify(&pw([2, 2, 2, 2, 2])).unwrap(), Verdict::Match);
        assert_eq!(store.eeprom().cells.get(&(0x0311 + 10)), Some(&0));
    }

    #[test]
    fn reopen_follows_selector() {
        let mut store =
            CredentialStore::open(CountingEeprom::default(), layout(CommitPolicy::Staged)).unwrap();
        store.store(&pw([4, 4, 4, 4, 4])).unwrap();

        let eeprom = CountingEeprom { cells: store.eeprom().cells.clone(), ..Default::default() };
        let mut reopened = CredentialStore::open(eeprom, layout(CommitPolicy::Staged)).unwrap();
        assert_eq!(reopened.active_slot(), 1);
        assert_eq!(reopened.load().unwrap(), pw([4, 4, 4, 4, 4]));
    }

    #[test]
    fn interrupted_staged_change_keeps_old_password() {
        let mut store =
            CredentialStore::open(CountingEeprom::default(), layout(CommitPolicy::Staged)).unwrap();
        store.store(&pw([1, 2, 3, 4, 5])).unwrap();

        // Writes so far: 5 digits + selector. Fail the third digit of the next commit.
        store.eeprom.fail_write_at = Some(6 + 2);
        assert!(store.store(&pw([9, 8, 7, 6, 5])).is_err());

        assert_eq!(store.verify(&pw([1, 2, 3, 4, 5])).unwrap(), Verdict::Match);
    }

    #[test]
    fn interrupted_in_place_change_corrupts() {
        let mut store =
            CredentialStore::open(CountingEeprom::default(), layout(CommitPolicy::InPlace))
                .unwrap();
        store.store(&pw([1, 2, 3, 4, 5])).unwrap();

        store.eeprom.fail_write_at = Some(5 + 2);
        assert!(store.store(&pw([9, 8, 7, 6, 5])).is_err());

        assert_eq!(store.verify(&pw([1, 2, 3, 4, 5])).unwrap(), Verdict::Mismatch);
        assert_eq!(store.verify(&pw([9, 8, 7, 6, 5])).unwrap(), Verdict::Mismatch);
        assert_eq!(store.load().unwrap(), pw([9, 8, 3, 4, 5]));
    }

    #[test]
    fn layout_past_end_of_address_space_is_rejected() {
        let layout = StoreLayout { base_address: u16::MAX - 2, ..layout(CommitPolicy::InPlace) };
        let mut store = CredentialStore::open(CountingEeprom::default(), layout).unwrap();
        assert!(matches!(
            store.store(&pw([1, 2, 3, 4, 5])),
            Err(StoreError::AddressOutOfRange { .. })
        ));
    }

    #[test]
    fn erased_store_reads_as_zeros() {
        let mut store =
            CredentialStore::open(CountingEeprom::default(), layout(CommitPolicy::InPlace))
                .unwrap();
        // Erased cells read 0xFF, which decodes as the digit 0.
        assert_eq!(store.load().unwrap(), pw([0, 0, 0, 0, 0]));
    }

    proptest! {
        #[test]
        fn prop_verify_short_circuits(
            stored in prop::array::uniform5(0u8..10),
            position in 0usize..5,
            delta in 1u8..10,
        ) {
            let mut candidate = stored;
            candidate[position] = (stored[position] + delta) % 10;

            let mut store =
                CredentialStore::open(CountingEeprom::default(), layout(CommitPolicy::InPlace))
                    .unwrap();
            store.store(&pw(stored)).unwrap();

            let before = store.eeprom().reads;
            prop_assert_eq!(store.verify(&pw(candidate)).unwrap(), Verdict::Mismatch);
            let reads = store.eeprom().reads - before;
            prop_assert!(reads <= position + 1, "{} reads for mismatch at {}", reads, position);

            prop_assert_eq!(store.verify(&pw(stored)).unwrap(), Verdict::Match);
        }
    }
}
