//! Back node control core.
//!
//! The back node owns the password store, the lock motor and the buzzer. It
//! only ever answers: every exchange starts with an opcode or digit-sequence
//! from the front node.
//!
//! Verification failures of any kind are answered as `Mismatch`. A malformed
//! candidate or a store fault is never reported on the wire, only logged.

use std::convert::Infallible;

use portcullis_proto::{Command, Password};

use crate::{
    alarm::run_alarm_window,
    channel::SerialChannel,
    config::ApplianceConfig,
    door::{DoorPhase, run_door_sequence},
    env::{Actuators, Eeprom, MotorDirection, Timer},
    error::NodeError,
    store::{CredentialStore, Verdict},
    ticks::TickClock,
};

/// Where the back node is in its service loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackState {
    /// Waiting for the provisioning exchange.
    AwaitingInitialSetup,
    /// Waiting for a request opcode.
    Idle,
    /// Comparing a candidate with the store.
    Verifying,
    /// Driving the motor through the door sequence.
    DoorSequence,
    /// Persisting a replacement password.
    Changing,
    /// Buzzer on.
    Alarm,
}

/// Result of one serviced exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    /// Confirmation did not match; setup starts over.
    SetupRetry,
    /// Password provisioned.
    SetupComplete,
    /// Door opened and closed again.
    DoorCycled,
    /// Open request refused.
    DoorRefused,
    /// Replacement password persisted.
    PasswordChanged,
    /// Change request refused.
    ChangeRefused,
    /// Alarm window ran to completion.
    AlarmSounded,
}

/// Back node: credential store, actuators and protocol responder.
pub struct BackNode<C, T, E, A> {
    channel: C,
    clock: TickClock<T>,
    store: CredentialStore<E>,
    actuators: A,
    config: ApplianceConfig,
    state: BackState,
}

impl<C, T, E, A> BackNode<C, T, E, A>
where
    C: SerialChannel,
    T: Timer,
    E: Eeprom,
    A: Actuators,
{
    /// Assemble a node in [`BackState::AwaitingInitialSetup`].
    ///
    /// Opening the store may read the EEPROM.
    pub fn new(
        channel: C,
        timer: T,
        eeprom: E,
        actuators: A,
        config: ApplianceConfig,
    ) -> Result<Self, NodeError> {
        let store = CredentialStore::open(eeprom, config.store)?;

        Ok(Self {
            channel,
            clock: TickClock::new(timer),
            store,
            actuators,
            config,
            state: BackState::AwaitingInitialSetup,
        })
    }

    /// Current state.
    pub fn state(&self) -> BackState {
        self.state
    }

    /// The password store.
    pub fn store(&self) -> &CredentialStore<E> {
        &self.store
    }

    /// The motor and buzzer.
    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    /// The node's tick clock.
    pub fn clock(&self) -> &TickClock<T> {
        &self.clock
    }

    /// Service setup rounds until a password is provisioned.
    pub fn initial_setup(&mut self) -> Result<(), NodeError> {
        while self.state == BackState::AwaitingInitialSetup {
            match self.step() {
                Err(err) if err.is_fatal() => return Err(err),
                _ => {},
            }
        }
        Ok(())
    }

    /// Service one exchange: a setup round before provisioning, one request
    /// afterwards.
    ///
    /// A non-fatal error leaves the actuators safe and the node idle (or still
    /// awaiting setup) before it is returned.
    pub fn step(&mut self) -> Result<BackOutcome, NodeError> {
        let result = if self.state == BackState::AwaitingInitialSetup {
            self.setup_round()
        } else {
            self.serve_request()
        };

        if let Err(err) = &result
            && !err.is_fatal()
        {
            self.recover(err);
        }

        result
    }

    /// Service requests until a fatal error.
    pub fn run(&mut self) -> Result<Infallible, NodeError> {
        loop {
            if let Err(err) = self.step()
                && err.is_fatal()
            {
                tracing::error!(%err, "back node stopped");
                return Err(err);
            }
        }
    }

    fn setup_round(&mut self) -> Result<BackOutcome, NodeError> {
        let received = tolerate(self.channel.receive_password())?;
        let stored = match received {
            Some(password) => tolerate(self.store.store(&password).map_err(NodeError::from))?,
            None => None,
        };

        let confirmation = tolerate(self.channel.receive_password())?;
        let verdict = match (stored, confirmation) {
            (Some(()), Some(candidate)) => self.verify(&candidate)?,
            _ => Verdict::Mismatch,
        };
        self.channel.send_command(verdict.command())?;

        match verdict {
            Verdict::Match => {
                tracing::info!("password provisioned");
                self.transition(BackState::Idle);
                Ok(BackOutcome::SetupComplete)
            },
            Verdict::Mismatch => {
                tracing::warn!("confirmation did not match, awaiting setup again");
                Ok(BackOutcome::SetupRetry)
            },
        }
    }

    fn serve_request(&mut self) -> Result<BackOutcome, NodeError> {
        self.transition(BackState::Idle);

        match self.channel.receive_command()? {
            Command::OpenDoorRequest => self.open_door(),
            Command::ChangePasswordRequest => self.change_password(),
            Command::TriggerAlarm => Ok(self.sound_alarm()),
            received @ (Command::Match | Command::Mismatch | Command::Ready) => {
                Err(NodeError::UnexpectedCommand { expected: "a request", received })
            },
        }
    }

    fn open_door(&mut self) -> Result<BackOutcome, NodeError> {
        if self.verify_candidate()? == Verdict::Mismatch {
            return Ok(BackOutcome::DoorRefused);
        }

        let signal = self.channel.receive_command()?;
        if signal != Command::Ready {
            return Err(NodeError::UnexpectedCommand { expected: "READY", received: signal });
        }
        self.channel.send_command(Command::Ready)?;

        self.transition(BackState::DoorSequence);
        let Self { clock, actuators, config, .. } = self;
        run_door_sequence(clock, &config.door, |phase| {
            let direction = match phase {
                DoorPhase::Unlocking => MotorDirection::Open,
                DoorPhase::Locking => MotorDirection::Close,
                DoorPhase::Idle | DoorPhase::Open | DoorPhase::Done => MotorDirection::Stop,
            };
            actuators.set_motor(direction);
        });

        self.transition(BackState::Idle);
        Ok(BackOutcome::DoorCycled)
    }

    fn change_password(&mut self) -> Result<BackOutcome, NodeError> {
        if self.verify_candidate()? == Verdict::Mismatch {
            return Ok(BackOutcome::ChangeRefused);
        }

        self.transition(BackState::Changing);
        let replacement = self.channel.receive_password()?;
        self.store.store(&replacement)?;
        tracing::info!(slot = self.store.active_slot(), "password changed");

        self.transition(BackState::Idle);
        Ok(BackOutcome::PasswordChanged)
    }

    fn sound_alarm(&mut self) -> BackOutcome {
        self.transition(BackState::Alarm);
        self.actuators.set_alarm(true);
        run_alarm_window(&mut self.clock, self.config.alarm_ticks);
        self.actuators.set_alarm(false);

        self.transition(BackState::Idle);
        BackOutcome::AlarmSounded
    }

    /// Receive a candidate, compare it and answer with the verdict.
    fn verify_candidate(&mut self) -> Result<Verdict, NodeError> {
        self.transition(BackState::Verifying);

        let verdict = match tolerate(self.channel.receive_password())? {
            Some(candidate) => self.verify(&candidate)?,
            None => Verdict::Mismatch,
        };
        self.channel.send_command(verdict.command())?;

        if verdict == Verdict::Mismatch {
            tracing::warn!("wrong password");
        }
        Ok(verdict)
    }

    fn verify(&mut self, candidate: &Password) -> Result<Verdict, NodeError> {
        let verdict = tolerate(self.store.verify(candidate).map_err(NodeError::from))?;
        Ok(verdict.unwrap_or(Verdict::Mismatch))
    }

    fn recover(&mut self, err: &NodeError) {
        tracing::warn!(%err, state = ?self.state, "back node fault");
        if self.clock.is_armed() {
            self.clock.disarm();
        }
        self.actuators.set_motor(MotorDirection::Stop);
        self.actuators.set_alarm(false);

        if self.state != BackState::AwaitingInitialSetup {
            self.transition(BackState::Idle);
        }
    }

    fn transition(&mut self, next: BackState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "back state");
            self.state = next;
        }
    }
}

/// Pass fatal errors through; log the rest and turn them into `None`.
fn tolerate<V>(result: Result<V, NodeError>) -> Result<Option<V>, NodeError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_fatal() => Err(err),
        Err(NodeError::Persistence(err)) => {
            tracing::error!(%err, "password store failure");
            Ok(None)
        },
        Err(err) => {
            tracing::warn!(%err, "discarding malformed input");
            Ok(None)
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::{collections::VecDeque, sync::Arc, time::Duration};

    use super::*;
    use crate::{
        env::TickHandler,
        error::{ChannelError, StoreError},
        store::{CommitPolicy, StoreLayout},
    };

    #[derive(Default)]
    struct ScriptedLink {
        inbound: VecDeque<u8>,
        outbound: Vec<u8>,
    }

    impl SerialChannel for ScriptedLink {
        fn send_byte(&mut self, byte: u8) -> Result<(), ChannelError> {
            self.outbound.push(byte);
            Ok(())
        }

        fn receive_byte(&mut self) -> Result<u8, ChannelError> {
            self.inbound.pop_front().ok_or(ChannelError::Closed)
        }
    }

    #[derive(Default)]
    struct StepTimer {
        handler: Option<Arc<dyn TickHandler>>,
        running: bool,
    }

    impl Timer for StepTimer {
        fn set_handler(&mut self, handler: Arc<dyn TickHandler>) {
            self.handler = Some(handler);
        }

        fn start(&mut self) -> bool {
            self.running = true;
            true
        }

        fn stop(&mut self) {
            self.running = false;
        }

        fn idle(&mut self) {
            if let (true, Some(handler)) = (self.running, &self.handler) {
                handler.on_tick();
            }
        }
    }

    #[derive(Default)]
    struct FlatEeprom {
        cells: Vec<u8>,
        fail_reads: bool,
    }

    impl Eeprom for FlatEeprom {
        fn read_byte(&mut self, address: u16) -> Result<u8, StoreError> {
            if self.fail_reads {
                return Err(StoreError::ReadFailed { address });
            }
            Ok(self.cells.get(usize::from(address)).copied().unwrap_or(0xFF))
        }

        fn write_byte(&mut self, address: u16, value: u8) -> Result<(), StoreError> {
            let index = usize::from(address);
            if self.cells.len() <= index {
                self.cells.resize(index + 1, 0xFF);
            }
            self.cells[index] = value;
            Ok(())
        }

        fn settle(&mut self, _duration: Duration) {}
    }

    #[derive(Default)]
    struct Journal {
        motor: Vec<MotorDirection>,
        alarm: Vec<bool>,
    }

    impl Actuators for Journal {
        fn set_motor(&mut self, direction: MotorDirection) {
            self.motor.push(direction);
        }

        fn set_alarm(&mut self, on: bool) {
            self.alarm.push(on);
        }
    }

    type TestNode = BackNode<ScriptedLink, StepTimer, FlatEeprom, Journal>;

    fn node(inbound: &[u8]) -> TestNode {
        let link =
            ScriptedLink { inbound: inbound.iter().copied().collect(), outbound: Vec::new() };
        BackNode::new(
            link,
            StepTimer::default(),
            FlatEeprom::default(),
            Journal::default(),
            ApplianceConfig::without_delays(),
        )
        .unwrap()
    }

    fn provisioned(inbound: &[u8]) -> TestNode {
        let mut setup = vec![1, 2, 3, 4, 5, b'#', 1, 2, 3, 4, 5, b'#'];
        setup.extend_from_slice(inbound);
        let mut node = node(&setup);
        assert_eq!(node.step().unwrap(), BackOutcome::SetupComplete);
        node.channel.outbound.clear();
        node
    }

    #[test]
    fn setup_stores_then_confirms() {
        let mut node = node(&[9, 9, 9, 9, 9, b'#', 9, 9, 9, 9, 8, b'#']);
        assert_eq!(node.step().unwrap(), BackOutcome::SetupRetry);
        assert_eq!(node.channel.outbound, vec![0x00]);
        assert_eq!(node.state(), BackState::AwaitingInitialSetup);

        let mut node = provisioned(&[]);
        assert_eq!(node.state(), BackState::Idle);
        assert_eq!(node.store.load().unwrap(), Password::new([1, 2, 3, 4, 5]).unwrap());
    }

    #[test]
    fn malformed_setup_entry_is_answered_as_mismatch() {
        let mut node = node(&[1, 2, b'#', 1, 2, 3, 4, 5, b'#']);
        assert_eq!(node.step().unwrap(), BackOutcome::SetupRetry);
        assert_eq!(node.channel.outbound, vec![0x00]);
    }

    #[test]
    fn open_door_drives_motor_through_sequence() {
        let mut node = provisioned(&[0x02, 1, 2, 3, 4, 5, b'#', 0x05]);
        assert_eq!(node.step().unwrap(), BackOutcome::DoorCycled);

        assert_eq!(node.channel.outbound, vec![0x01, 0x05]);
        assert_eq!(
            node.actuators().motor,
            vec![
                MotorDirection::Open,
                MotorDirection::Stop,
                MotorDirection::Close,
                MotorDirection::Stop,
            ]
        );
        assert!(!node.clock().is_armed());
    }

    #[test]
    fn wrong_password_refuses_door() {
        let mut node = provisioned(&[0x02, 1, 2, 3, 4, 6, b'#']);
        assert_eq!(node.step().unwrap(), BackOutcome::DoorRefused);
        assert_eq!(node.channel.outbound, vec![0x00]);
        assert!(node.actuators().motor.is_empty());
    }

    #[test]
    fn change_persists_replacement() {
        let mut node = provisioned(&[0x03, 1, 2, 3, 4, 5, b'#', 0xFF, 9, 8, 7, 6, b'#']);
        assert_eq!(node.step().unwrap(), BackOutcome::PasswordChanged);
        assert_eq!(node.store.load().unwrap(), Password::new([0, 9, 8, 7, 6]).unwrap());
    }

    #[test]
    fn alarm_toggles_buzzer() {
        let mut node = provisioned(&[0x04]);
        assert_eq!(node.step().unwrap(), BackOutcome::AlarmSounded);
        assert_eq!(node.actuators().alarm, vec![true, false]);
        assert!(node.channel.outbound.is_empty());
    }

    #[test]
    fn store_failure_during_verification_is_a_mismatch() {
        let mut node = provisioned(&[0x02, 1, 2, 3, 4, 5, b'#']);
        node.store = CredentialStore::open(
            FlatEeprom { fail_reads: true, ..FlatEeprom::default() },
            StoreLayout { policy: CommitPolicy::InPlace, ..StoreLayout::default() },
        )
        .unwrap();

        assert_eq!(node.step().unwrap(), BackOutcome::DoorRefused);
        assert_eq!(node.channel.outbound, vec![0x00]);
    }

    #[test]
    fn unexpected_opcode_is_recoverable() {
        let mut node = provisioned(&[0x05, 0x04]);
        let err = node.step().unwrap_err();
        assert_eq!(
            err,
            NodeError::UnexpectedCommand { expected: "a request", received: Command::Ready }
        );
        assert!(!err.is_fatal());
        assert_eq!(node.state(), BackState::Idle);

        assert_eq!(node.step().unwrap(), BackOutcome::AlarmSounded);
    }

    #[test]
    fn missing_ready_aborts_door() {
        let mut node = provisioned(&[0x02, 1, 2, 3, 4, 5, b'#', 0x04]);
        assert!(matches!(node.step(), Err(NodeError::UnexpectedCommand { expected: "READY", .. })));
        assert_eq!(node.actuators().motor, vec![MotorDirection::Stop]);
    }

    #[test]
    fn run_ends_when_link_closes() {
        let mut node = provisioned(&[0x7F, 0x04]);
        assert_eq!(node.run().unwrap_err(), NodeError::Channel(ChannelError::Closed));
        assert_eq!(node.actuators().alarm, vec![false, true, false]);
    }
}
