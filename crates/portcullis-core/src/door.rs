//! Door motion timing.
//!
//! One linear sequence driven purely by elapsed ticks since arming:
//!
//! ```text
//! 0            unlock        unlock+dwell          total
//! |--Unlocking--|-----Open-----|------Locking--------|--Done
//! ```
//!
//! Each node runs the sequence on its own clock. The only coordination is the
//! `Ready` handshake that precedes arming on both sides.

use crate::{
    env::Timer,
    ticks::{TickClock, Ticks},
};

/// Interrupts needed for 15 s of motor travel at the firmware tick period.
pub const UNLOCK_TICKS: Ticks = 457;

/// Interrupts needed for the 3 s the door stays open.
pub const DWELL_TICKS: Ticks = 91;

/// Interrupts needed for 15 s of motor travel back.
pub const LOCK_TICKS: Ticks = 457;

/// Phase of the door sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorPhase {
    /// Sequence not running.
    Idle,
    /// Motor opening the lock.
    Unlocking,
    /// Lock held open.
    Open,
    /// Motor closing the lock.
    Locking,
    /// Final threshold reached.
    Done,
}

/// Phases during which the sequence waits, in order.
pub const TIMED_PHASES: [DoorPhase; 3] =
    [DoorPhase::Unlocking, DoorPhase::Open, DoorPhase::Locking];

/// Tick thresholds of the door sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorTiming {
    /// Length of the unlocking phase.
    pub unlock: Ticks,
    /// Length of the open phase.
    pub dwell: Ticks,
    /// Length of the locking phase.
    pub lock: Ticks,
}

impl Default for DoorTiming {
    fn default() -> Self {
        Self { unlock: UNLOCK_TICKS, dwell: DWELL_TICKS, lock: LOCK_TICKS }
    }
}

impl DoorTiming {
    /// Ticks at which the sequence is done.
    pub const fn total(&self) -> Ticks {
        self.unlock.saturating_add(self.dwell).saturating_add(self.lock)
    }

    /// Threshold at which a phase ends. `None` for untimed phases.
    pub const fn phase_end(&self, phase: DoorPhase) -> Option<Ticks> {
        match phase {
            DoorPhase::Unlocking => Some(self.unlock),
            DoorPhase::Open => Some(self.unlock.saturating_add(self.dwell)),
            DoorPhase::Locking => Some(self.total()),
            DoorPhase::Idle | DoorPhase::Done => None,
        }
    }

    /// Phase at a tick count since arming.
    ///
    /// Total over all tick values. A boundary tick belongs to the phase that
    /// starts there.
    pub const fn phase_at(&self, ticks: Ticks) -> DoorPhase {
        if ticks < self.unlock {
            DoorPhase::Unlocking
        } else if ticks < self.unlock.saturating_add(self.dwell) {
            DoorPhase::Open
        } else if ticks < self.total() {
            DoorPhase::Locking
        } else {
            DoorPhase::Done
        }
    }
}

/// Run one full door cycle on a node's clock.
///
/// Arms the clock, reports each phase as it starts, blocks until it ends,
/// reports [`DoorPhase::Done`] and disarms.
pub fn run_door_sequence<T, F>(clock: &mut TickClock<T>, timing: &DoorTiming, mut on_phase: F)
where
    T: Timer,
    F: FnMut(DoorPhase),
{
    clock.arm();

    for phase in TIMED_PHASES {
        tracing::info!(?phase, at = clock.current_ticks(), "door phase");
        on_phase(phase);
        if let Some(end) = timing.phase_end(phase) {
            clock.wait_until(end);
        }
    }

    tracing::info!(phase = ?DoorPhase::Done, at = clock.current_ticks(), "door phase");
    on_phase(DoorPhase::Done);
    clock.disarm();
}
