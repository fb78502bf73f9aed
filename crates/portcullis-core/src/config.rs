//! Appliance configuration.
//!
//! Defaults reproduce the reference hardware: an 8 MHz clock with a 1024
//! prescaler overflowing an 8-bit timer, giving one tick every 32.768 ms.

use std::time::Duration;

use crate::{
    alarm::{ALARM_THRESHOLD, ALARM_TICKS},
    door::DoorTiming,
    store::StoreLayout,
    ticks::Ticks,
};

/// Timer period of the reference hardware.
pub const TICK_PERIOD: Duration = Duration::from_micros(32_768);

/// Behavioural configuration shared by both nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplianceConfig {
    /// Door sequence thresholds.
    pub door: DoorTiming,
    /// Length of the alarm window.
    pub alarm_ticks: Ticks,
    /// Consecutive wrong passwords before the alarm.
    pub max_wrong_attempts: u8,
    /// Credential placement on the back node.
    pub store: StoreLayout,
    /// How long "Wrong Password" stays on screen.
    pub message_hold: Duration,
    /// Pause after each accepted password key.
    pub key_hold: Duration,
    /// Pause after the menu key.
    pub menu_hold: Duration,
}

impl Default for ApplianceConfig {
    fn default() -> Self {
        Self {
            door: DoorTiming::default(),
            alarm_ticks: ALARM_TICKS,
            max_wrong_attempts: ALARM_THRESHOLD,
            store: StoreLayout::default(),
            message_hold: Duration::from_secs(1),
            key_hold: Duration::from_millis(400),
            menu_hold: Duration::from_millis(500),
        }
    }
}

impl ApplianceConfig {
    /// Configuration with every hold and settle delay removed.
    ///
    /// Used by simulations where only tick timing matters.
    pub fn without_delays() -> Self {
        let mut config = Self::default();
        config.store.settle = Duration::ZERO;
        config.message_hold = Duration::ZERO;
        config.key_hold = Duration::ZERO;
        config.menu_hold = Duration::ZERO;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_firmware() {
        let config = ApplianceConfig::default();
        assert_eq!(config.door.total(), 1005);
        assert_eq!(config.alarm_ticks, 1828);
        assert_eq!(config.max_wrong_attempts, 3);
        assert_eq!(config.store.base_address, 0x0311);
        assert_eq!(config.store.settle, Duration::from_millis(10));
    }

    #[test]
    fn without_delays_keeps_tick_timing() {
        let config = ApplianceConfig::without_delays();
        assert_eq!(config.door, DoorTiming::default());
        assert!(config.key_hold.is_zero());
        assert!(config.store.settle.is_zero());
    }
}
