//! EEPROM with injected faults.
//!
//! Wraps [`MemoryEeprom`] and fails reads or writes either at random (seeded,
//! so every run is reproducible) or at an exact write index, which is how an
//! interrupted password change is staged.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use portcullis_core::{Eeprom, StoreError};
use portcullis_host::MemoryEeprom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

struct Chaos {
    rng: ChaCha8Rng,
    read_failure_rate: f64,
    write_failure_rate: f64,
    fail_write_at: Option<usize>,
    reads: usize,
    writes: usize,
    injected: usize,
}

/// Fault-injecting EEPROM.
///
/// Clones share both the memory and the fault schedule. A failed write leaves
/// the cell untouched.
#[derive(Clone)]
pub struct ChaoticEeprom {
    memory: MemoryEeprom,
    chaos: Arc<Mutex<Chaos>>,
}

impl ChaoticEeprom {
    /// Fault-free EEPROM over fresh memory. `seed` drives random failures.
    pub fn new(seed: u64) -> Self {
        Self::over(MemoryEeprom::default(), seed)
    }

    /// Fault-free EEPROM over existing memory.
    pub fn over(memory: MemoryEeprom, seed: u64) -> Self {
        Self {
            memory,
            chaos: Arc::new(Mutex::new(Chaos {
                rng: ChaCha8Rng::seed_from_u64(seed),
                read_failure_rate: 0.0,
                write_failure_rate: 0.0,
                fail_write_at: None,
                reads: 0,
                writes: 0,
                injected: 0,
            })),
        }
    }

    /// Fail each read with probability `rate`.
    pub fn set_read_failure_rate(&self, rate: f64) {
        self.lock().read_failure_rate = rate.clamp(0.0, 1.0);
    }

    /// Fail each write with probability `rate`.
    pub fn set_write_failure_rate(&self, rate: f64) {
        self.lock().write_failure_rate = rate.clamp(0.0, 1.0);
    }

    /// Fail the write with zero-based index `index` counted from creation.
    pub fn fail_write_at(&self, index: usize) {
        self.lock().fail_write_at = Some(index);
    }

    /// Remove every fault.
    pub fn heal(&self) {
        let mut chaos = self.lock();
        chaos.read_failure_rate = 0.0;
        chaos.write_failure_rate = 0.0;
        chaos.fail_write_at = None;
    }

    /// Underlying memory.
    pub fn memory(&self) -> MemoryEeprom {
        self.memory.clone()
    }

    /// Writes attempted so far, failed ones included.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Reads attempted so far, failed ones included.
    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    /// Faults injected so far.
    pub fn injected(&self) -> usize {
        self.lock().injected
    }

    fn lock(&self) -> MutexGuard<'_, Chaos> {
        self.chaos.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Eeprom for ChaoticEeprom {
    fn read_byte(&mut self, address: u16) -> Result<u8, StoreError> {
        {
            let mut chaos = self.lock();
            chaos.reads += 1;
            let rate = chaos.read_failure_rate;
            if rate > 0.0 && chaos.rng.gen_bool(rate) {
                chaos.injected += 1;
                tracing::debug!(address, "injected read failure");
                return Err(StoreError::ReadFailed { address });
            }
        }
        self.memory.read_byte(address)
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), StoreError> {
        {
            let mut chaos = self.lock();
            let index = chaos.writes;
            chaos.writes += 1;

            let rate = chaos.write_failure_rate;
            let scheduled = chaos.fail_write_at == Some(index);
            if scheduled || (rate > 0.0 && chaos.rng.gen_bool(rate)) {
                chaos.injected += 1;
                tracing::debug!(address, index, "injected write failure");
                return Err(StoreError::WriteFailed { address });
            }
        }
        self.memory.write_byte(address, value)
    }

    fn settle(&mut self, _duration: Duration) {}
}
