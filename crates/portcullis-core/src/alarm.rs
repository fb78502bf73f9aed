//! Wrong-attempt tracking and the alarm window.

use crate::{
    env::Timer,
    store::Verdict,
    ticks::{TickClock, Ticks},
};

/// Consecutive wrong passwords that trigger the alarm.
pub const ALARM_THRESHOLD: u8 = 3;

/// Interrupts needed for the one-minute alarm window.
pub const ALARM_TICKS: Ticks = 1828;

/// What the front node must do after recording a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Return to the menu.
    None,
    /// Threshold reached: raise the alarm.
    TriggerAlarm,
}

/// Consecutive authentication failures seen by the front node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTracker {
    wrong: u8,
    threshold: u8,
}

impl Default for AttemptTracker {
    fn default() -> Self {
        Self::new(ALARM_THRESHOLD)
    }
}

impl AttemptTracker {
    /// Create a tracker escalating after `threshold` consecutive failures.
    ///
    /// A threshold of zero is treated as one.
    pub const fn new(threshold: u8) -> Self {
        Self { wrong: 0, threshold: if threshold == 0 { 1 } else { threshold } }
    }

    /// Record a verification result.
    ///
    /// A match clears the count. A mismatch increments it and escalates once
    /// the threshold is reached. The count stays at the threshold until
    /// [`AttemptTracker::reset`] is called.
    pub fn record(&mut self, verdict: Verdict) -> Escalation {
        match verdict {
            Verdict::Match => {
                self.wrong = 0;
                Escalation::None
            },
            Verdict::Mismatch => {
                self.wrong = self.wrong.saturating_add(1).min(self.threshold);
                if self.wrong >= self.threshold {
                    Escalation::TriggerAlarm
                } else {
                    Escalation::None
                }
            },
        }
    }

    /// Consecutive failures recorded since the last reset or match.
    pub const fn count(&self) -> u8 {
        self.wrong
    }

    /// Failures needed to escalate.
    pub const fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Clear the count.
    pub fn reset(&mut self) {
        self.wrong = 0;
    }
}

/// Block for the alarm window on a node's clock.
///
/// Arms, waits `ticks`, disarms. Nothing else is serviced meanwhile.
pub fn run_alarm_window<T: Timer>(clock: &mut TickClock<T>, ticks: Ticks) {
    clock.arm();
    tracing::info!(ticks, "alarm window started");
    clock.wait_until(ticks);
    tracing::info!(elapsed = clock.current_ticks(), "alarm window elapsed");
    clock.disarm();
}
