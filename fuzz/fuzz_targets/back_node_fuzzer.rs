//! Fuzz target for the [`BackNode`] service loop
//!
//! Prevent a hostile or corrupted link from leaving the lock open
//!
//! # Strategy
//!
//! - Inbound bytes: arbitrary stream standing in for the front node
//! - Store faults: seeded random read and write failures
//! - Commit policy: both in-place and staged layouts
//!
//! # Invariants
//!
//! - NEVER panic on any input
//! - The loop ends only when the link runs dry, with `Closed`
//! - Every reply is `Match`, `Mismatch` or `Ready`
//! - Every motor run ends with the motor stopped
//! - Every alarm ends with the buzzer off

#![no_main]

use std::collections::VecDeque;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use portcullis_core::{
    ApplianceConfig, BackNode, ChannelError, CommitPolicy, DoorTiming, MotorDirection, NodeError,
    SerialChannel,
};
use portcullis_harness::{ChaoticEeprom, RecordingActuators, SimTimer};
use portcullis_host::ActuatorEvent;
use portcullis_proto::Command;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    seed: u64,
    staged: bool,
    read_faults: bool,
    write_faults: bool,
    inbound: Vec<u8>,
}

/// Link fed from the fuzz input. Runs dry with `Closed`.
struct ByteLink {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
}

impl SerialChannel for ByteLink {
    fn send_byte(&mut self, byte: u8) -> Result<(), ChannelError> {
        self.outbound.push(byte);
        Ok(())
    }

    fn receive_byte(&mut self) -> Result<u8, ChannelError> {
        self.inbound.pop_front().ok_or(ChannelError::Closed)
    }
}

fuzz_target!(|input: FuzzInput| {
    let mut config = ApplianceConfig::without_delays();
    config.door = DoorTiming { unlock: 4, dwell: 2, lock: 3 };
    config.alarm_ticks = 5;
    config.store.policy = if input.staged { CommitPolicy::Staged } else { CommitPolicy::InPlace };

    let eeprom = ChaoticEeprom::new(input.seed);
    if input.read_faults {
        eeprom.set_read_failure_rate(0.05);
    }
    if input.write_faults {
        eeprom.set_write_failure_rate(0.05);
    }

    let timer = SimTimer::new();
    let actuators = RecordingActuators::new(timer.clone());
    let mut link = ByteLink { inbound: input.inbound.into(), outbound: Vec::new() };

    let Ok(mut node) = BackNode::new(&mut link, timer, eeprom, actuators.clone(), config) else {
        return;
    };

    let Err(err) = node.run();
    assert_eq!(err, NodeError::Channel(ChannelError::Closed));
    drop(node);

    for &byte in &link.outbound {
        assert!(
            matches!(
                Command::from_u8(byte),
                Some(Command::Match | Command::Mismatch | Command::Ready)
            ),
            "unexpected reply {byte:#04x}"
        );
    }

    let mut motor = MotorDirection::Stop;
    let mut buzzer = false;
    for event in actuators.commands() {
        match event {
            ActuatorEvent::Motor(direction) => motor = direction,
            ActuatorEvent::Alarm(on) => buzzer = on,
        }
    }
    assert_eq!(motor, MotorDirection::Stop, "motor left running");
    assert!(!buzzer, "buzzer left on");
});
