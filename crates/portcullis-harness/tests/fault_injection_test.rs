//! Fault injection tests for the password store.
//!
//! These tests validate what the appliance does when its EEPROM misbehaves:
//! - Read failures during verification
//! - Write failures during setup
//! - A password change interrupted part-way, under both commit policies
//!
//! A store fault is never reported on the wire. The front node only ever sees
//! `Match` or `Mismatch`, so the user-visible effect of a fault is a refused
//! password, never a hung or crashed appliance.

use portcullis_core::{
    ApplianceConfig, BackOutcome, CommitPolicy, DEFAULT_BASE_ADDRESS, FrontOutcome, FrontState,
    MotorDirection, NodeError, StoreError,
};
use portcullis_harness::{ChaoticEeprom, SimAppliance};
use portcullis_host::ActuatorEvent;
use portcullis_proto::Password;

fn password(values: [u8; 5]) -> Password {
    Password::new(values).expect("valid digits")
}

fn provisioned(policy: CommitPolicy, seed: u64) -> SimAppliance {
    let mut config = ApplianceConfig::without_delays();
    config.store.policy = policy;

    let mut sim = SimAppliance::new(config, ChaoticEeprom::new(seed)).expect("appliance");
    assert_eq!(
        sim.provision(&password([1, 2, 3, 4, 5])).expect("setup"),
        FrontOutcome::SetupComplete
    );
    sim
}

#[test]
fn verification_stops_at_first_differing_digit() {
    let mut sim = provisioned(CommitPolicy::Staged, 0);

    let cases = [("+92345", 1), ("+12945", 3), ("+12349", 5), ("+12345", 5)];
    for (keys, expected_reads) in cases {
        let before = sim.eeprom().reads();
        sim.drive(keys).expect("attempt");
        assert_eq!(sim.eeprom().reads() - before, expected_reads, "{keys}");
    }
}

#[test]
fn read_failure_is_answered_as_mismatch() {
    let mut sim = provisioned(CommitPolicy::Staged, 0);
    sim.eeprom().set_read_failure_rate(1.0);

    let outcomes = sim.drive("+12345").expect("attempt");
    assert_eq!(outcomes, vec![FrontOutcome::WrongPassword { attempts: 1 }]);
    assert_eq!(sim.back_log().last().cloned(), Some(Ok(BackOutcome::DoorRefused)));
    assert!(sim.eeprom().injected() > 0);

    sim.eeprom().heal();
    let outcomes = sim.drive("+12345").expect("attempt");
    assert_eq!(outcomes, vec![FrontOutcome::DoorCycled]);
    assert_eq!(sim.front().wrong_attempts(), 0);
}

#[test]
fn write_failure_during_setup_retries_setup() {
    let mut sim = SimAppliance::fresh(0).expect("appliance");
    sim.eeprom().set_write_failure_rate(1.0);

    let outcome = sim.provision(&password([5, 5, 5, 5, 5])).expect("setup");
    assert_eq!(outcome, FrontOutcome::SetupRetry);
    assert_eq!(sim.front_state(), FrontState::AwaitingInitialSetup);

    sim.eeprom().heal();
    let outcome = sim.provision(&password([5, 5, 5, 5, 5])).expect("setup");
    assert_eq!(outcome, FrontOutcome::SetupComplete);
    assert_eq!(sim.stored_password().expect("stored"), password([5; 5]));
}

#[test]
fn interrupted_staged_change_keeps_old_password() {
    // Setup wrote one slot and the selector; the change writes the other slot
    // then the selector again.
    let setup_writes = 6;

    for failing in setup_writes..setup_writes + 6 {
        let mut sim = provisioned(CommitPolicy::Staged, 0);
        assert_eq!(sim.eeprom().writes(), setup_writes);
        sim.eeprom().fail_write_at(failing);

        // The front node has no way of learning the change failed.
        let outcomes = sim.drive("-12345 67890").expect("change");
        assert_eq!(outcomes, vec![FrontOutcome::PasswordChanged]);
        assert!(
            matches!(
                sim.back_log().last(),
                Some(Err(NodeError::Persistence(StoreError::WriteFailed { .. })))
            ),
            "write {failing}: {:?}",
            sim.back_log().last()
        );

        // Fault recovery leaves the actuators safe.
        assert_eq!(
            sim.actuators().commands(),
            vec![ActuatorEvent::Motor(MotorDirection::Stop), ActuatorEvent::Alarm(false)]
        );

        assert_eq!(sim.stored_password().expect("stored"), password([1, 2, 3, 4, 5]));
        let outcomes = sim.drive("+12345").expect("old password");
        assert_eq!(outcomes, vec![FrontOutcome::DoorCycled], "write {failing}");
    }
}

#[test]
fn interrupted_in_place_change_tears_the_password() {
    let mut sim = provisioned(CommitPolicy::InPlace, 0);
    assert_eq!(sim.eeprom().writes(), 5);
    sim.eeprom().fail_write_at(7);

    sim.drive("-12345 67890").expect("change");
    assert_eq!(
        sim.back_log().last().cloned(),
        Some(Err(NodeError::Persistence(StoreError::WriteFailed {
            address: DEFAULT_BASE_ADDRESS + 2
        })))
    );

    // Two digits of the new password landed before the failure.
    assert_eq!(sim.stored_password().expect("stored"), password([6, 7, 3, 4, 5]));
    let outcomes = sim.drive("+12345 +67890").expect("neither works");
    assert_eq!(
        outcomes,
        vec![
            FrontOutcome::WrongPassword { attempts: 1 },
            FrontOutcome::WrongPassword { attempts: 2 },
        ]
    );
}

#[test]
fn random_read_faults_never_wedge_the_appliance() {
    let run = |seed| {
        let mut sim = provisioned(CommitPolicy::Staged, seed);
        sim.eeprom().set_read_failure_rate(0.1);

        let outcomes = sim.drive(&"+12345".repeat(12)).expect("session");
        assert_eq!(outcomes.len(), 12);
        assert!(outcomes.iter().all(|o| matches!(
            o,
            FrontOutcome::DoorCycled
                | FrontOutcome::WrongPassword { .. }
                | FrontOutcome::AlarmRaised
        )));
        assert!(sim.back_log().iter().all(Result::is_ok));

        sim.eeprom().heal();
        assert_eq!(sim.stored_password().expect("stored"), password([1, 2, 3, 4, 5]));
        outcomes
    };

    for seed in [1, 7, 42] {
        assert_eq!(run(seed), run(seed), "seed {seed} is not reproducible");
    }
}
