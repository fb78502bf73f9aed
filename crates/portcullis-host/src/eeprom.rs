//! RAM-backed EEPROM.

use std::sync::{Arc, Mutex, PoisonError};

use portcullis_core::{Eeprom, StoreError};

/// Capacity of the reference part (1 KiB).
pub const DEFAULT_CAPACITY: usize = 1024;

/// Erased cell value.
pub const ERASED: u8 = 0xFF;

/// Byte-addressed memory that outlives the node using it.
///
/// Clones share the same cells, so a test or the runner can keep a handle
/// while the back node owns another, and a "reboot" can reopen the same
/// contents.
#[derive(Clone)]
pub struct MemoryEeprom {
    cells: Arc<Mutex<Vec<u8>>>,
}

impl Default for MemoryEeprom {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MemoryEeprom {
    /// Erased memory of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { cells: Arc::new(Mutex::new(vec![ERASED; capacity])) }
    }

    /// Copy of `len` bytes starting at `address`, clipped to the capacity.
    pub fn snapshot(&self, address: u16, len: usize) -> Vec<u8> {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        let start = usize::from(address).min(cells.len());
        let end = start.saturating_add(len).min(cells.len());
        cells[start..end].to_vec()
    }
}

impl Eeprom for MemoryEeprom {
    fn read_byte(&mut self, address: u16) -> Result<u8, StoreError> {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.get(usize::from(address)).copied().ok_or(StoreError::ReadFailed { address })
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), StoreError> {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        let cell = cells.get_mut(usize::from(address)).ok_or(StoreError::WriteFailed { address })?;
        *cell = value;
        Ok(())
    }
}
