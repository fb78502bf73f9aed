//! Front node control core.
//!
//! The front node owns the keypad and display and initiates every exchange.
//! It never sees the stored password; it only learns `Match`/`Mismatch`
//! verdicts from the back node.
//!
//! ```text
//! AwaitingInitialSetup --Match--> Idle
//! Idle --[+]--> VerifyingForOpen   --Match--> DoorSequence --> Idle
//! Idle --[-]--> VerifyingForChange --Match--> CollectNewPassword --> Idle
//! Verifying* --Mismatch--> Idle, or AlarmSequence --> Idle on the third in a row
//! ```

use std::convert::Infallible;

use portcullis_proto::{Command, Digit, PASSWORD_LEN, Password};

use crate::{
    alarm::{AttemptTracker, Escalation, run_alarm_window},
    channel::SerialChannel,
    config::ApplianceConfig,
    door::{DoorPhase, run_door_sequence},
    env::{Key, Panel, Timer},
    error::NodeError,
    store::Verdict,
    ticks::TickClock,
};

/// Display texts, laid out for a 2-row character display.
pub mod screen {
    /// Row 0 of the first setup prompt and of the verification prompt.
    pub const ENTER: &str = "Please Enter";
    /// Row 0 of the setup confirmation prompt.
    pub const REENTER: &str = "Please Reenter ";
    /// Row 0 of the new-password prompt.
    pub const ENTER_NEW: &str = "Enter New";
    /// Row 1 of every password prompt.
    pub const PASSWORD: &str = "Password: ";
    /// Echoed once per accepted digit.
    pub const MASK: &str = "*";
    /// Menu row 0.
    pub const MENU_OPEN: &str = " + : Open Door";
    /// Menu row 1.
    pub const MENU_CHANGE: &str = " - : Change Password";
    /// Shown after a mismatch.
    pub const WRONG_PASSWORD: &str = " Wrong Password";
    /// Shown during the alarm window and after a protocol fault.
    pub const ERROR: &str = "   ERROR !!   ";
    /// Door sequence, unlocking phase.
    pub const DOOR_UNLOCKING: &str = "Door unlocking";
    /// Door sequence, open phase.
    pub const DOOR_OPEN: &str = " Door is Open";
    /// Door sequence, locking phase.
    pub const DOOR_LOCKING: &str = " Door locking";
}

/// Where the front node is in its control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontState {
    /// No password provisioned yet.
    AwaitingInitialSetup,
    /// Menu shown, waiting for `+` or `-`.
    Idle,
    /// Collecting and verifying a password before opening.
    VerifyingForOpen,
    /// Door timing running.
    DoorSequence,
    /// Collecting and verifying a password before a change.
    VerifyingForChange,
    /// Collecting the replacement password.
    CollectNewPassword,
    /// Alarm window running.
    AlarmSequence,
}

/// Result of one pass through the front control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontOutcome {
    /// Setup entries did not match; setup starts over.
    SetupRetry,
    /// Password provisioned; the menu is next.
    SetupComplete,
    /// Menu key was neither `+` nor `-`.
    KeyIgnored,
    /// Verification failed below the alarm threshold.
    WrongPassword {
        /// Consecutive failures so far.
        attempts: u8,
    },
    /// Door opened and closed again.
    DoorCycled,
    /// Replacement password sent.
    PasswordChanged,
    /// Alarm window ran to completion.
    AlarmRaised,
}

/// Front node: keypad, display and protocol initiator.
pub struct FrontNode<C, T, P> {
    channel: C,
    clock: TickClock<T>,
    panel: P,
    config: ApplianceConfig,
    attempts: AttemptTracker,
    state: FrontState,
}

impl<C, T, P> FrontNode<C, T, P>
where
    C: SerialChannel,
    T: Timer,
    P: Panel,
{
    /// Assemble a node in [`FrontState::AwaitingInitialSetup`].
    pub fn new(channel: C, timer: T, panel: P, config: ApplianceConfig) -> Self {
        Self {
            channel,
            clock: TickClock::new(timer),
            panel,
            attempts: AttemptTracker::new(config.max_wrong_attempts),
            config,
            state: FrontState::AwaitingInitialSetup,
        }
    }

    /// Current state.
    pub fn state(&self) -> FrontState {
        self.state
    }

    /// Consecutive wrong passwords since the last success or alarm.
    pub fn wrong_attempts(&self) -> u8 {
        self.attempts.count()
    }

    /// The keypad/display.
    pub fn panel(&self) -> &P {
        &self.panel
    }

    /// The node's tick clock.
    pub fn clock(&self) -> &TickClock<T> {
        &self.clock
    }

    /// Run setup rounds until a password is provisioned.
    ///
    /// Only fatal errors end setup early.
    pub fn initial_setup(&mut self) -> Result<(), NodeError> {
        while self.state == FrontState::AwaitingInitialSetup {
            match self.step() {
                Err(err) if err.is_fatal() => return Err(err),
                _ => {},
            }
        }
        Ok(())
    }

    /// Run one pass of the control loop: a setup round before provisioning,
    /// one menu interaction afterwards.
    ///
    /// A non-fatal error shows the error banner and leaves the node idle (or
    /// still awaiting setup) before it is returned.
    pub fn step(&mut self) -> Result<FrontOutcome, NodeError> {
        let result = if self.state == FrontState::AwaitingInitialSetup {
            self.setup_round()
        } else {
            self.serve_menu()
        };

        if let Err(err) = &result
            && !err.is_fatal()
        {
            self.recover(err);
        }

        result
    }

    /// Run the control loop until a fatal error.
    pub fn run(&mut self) -> Result<Infallible, NodeError> {
        loop {
            if let Err(err) = self.step()
                && err.is_fatal()
            {
                tracing::error!(%err, "front node stopped");
                return Err(err);
            }
        }
    }

    fn setup_round(&mut self) -> Result<FrontOutcome, NodeError> {
        self.prompt(screen::ENTER);
        let first = self.collect_password()?;
        self.channel.send_password(&first)?;

        self.prompt(screen::REENTER);
        let second = self.collect_password()?;
        self.channel.send_password(&second)?;

        match self.receive_verdict()? {
            Verdict::Match => {
                tracing::info!("password provisioned");
                self.transition(FrontState::Idle);
                Ok(FrontOutcome::SetupComplete)
            },
            Verdict::Mismatch => {
                tracing::warn!("confirmation did not match, restarting setup");
                Ok(FrontOutcome::SetupRetry)
            },
        }
    }

    fn serve_menu(&mut self) -> Result<FrontOutcome, NodeError> {
        self.transition(FrontState::Idle);
        self.panel.clear();
        self.panel.display_text(screen::MENU_OPEN);
        self.panel.display_text_at(1, 0, screen::MENU_CHANGE);

        let key = self.panel.read_key()?;
        self.panel.hold(self.config.menu_hold);

        let (request, verifying) = match key {
            Key::Plus => (Command::OpenDoorRequest, FrontState::VerifyingForOpen),
            Key::Minus => (Command::ChangePasswordRequest, FrontState::VerifyingForChange),
            Key::Digit(_) | Key::Other(_) => {
                tracing::debug!("menu key ignored");
                return Ok(FrontOutcome::KeyIgnored);
            },
        };

        self.transition(verifying);
        self.channel.send_command(request)?;
        self.prompt(screen::ENTER);
        let candidate = self.collect_password()?;
        self.channel.send_password(&candidate)?;

        let verdict = self.receive_verdict()?;
        if self.attempts.record(verdict) == Escalation::TriggerAlarm {
            self.show_wrong_password();
            self.alarm_sequence()?;
            return Ok(FrontOutcome::AlarmRaised);
        }

        match (verdict, verifying) {
            (Verdict::Mismatch, _) => {
                self.show_wrong_password();
                self.transition(FrontState::Idle);
                Ok(FrontOutcome::WrongPassword { attempts: self.attempts.count() })
            },
            (Verdict::Match, FrontState::VerifyingForOpen) => {
                self.door_sequence()?;
                Ok(FrontOutcome::DoorCycled)
            },
            (Verdict::Match, _) => {
                self.transition(FrontState::CollectNewPassword);
                self.prompt(screen::ENTER_NEW);
                let replacement = self.collect_password()?;
                self.channel.send_password(&replacement)?;
                tracing::info!("replacement password sent");
                self.transition(FrontState::Idle);
                Ok(FrontOutcome::PasswordChanged)
            },
        }
    }

    fn door_sequence(&mut self) -> Result<(), NodeError> {
        self.channel.send_command(Command::Ready)?;
        let reply = self.channel.receive_command()?;
        if reply != Command::Ready {
            return Err(NodeError::UnexpectedCommand { expected: "READY", received: reply });
        }

        self.transition(FrontState::DoorSequence);
        let Self { clock, panel, config, .. } = self;
        run_door_sequence(clock, &config.door, |phase| {
            let text = match phase {
                DoorPhase::Unlocking => screen::DOOR_UNLOCKING,
                DoorPhase::Open => screen::DOOR_OPEN,
                DoorPhase::Locking => screen::DOOR_LOCKING,
                DoorPhase::Idle | DoorPhase::Done => return,
            };
            panel.clear();
            panel.display_text(text);
        });

        self.transition(FrontState::Idle);
        Ok(())
    }

    fn alarm_sequence(&mut self) -> Result<(), NodeError> {
        self.transition(FrontState::AlarmSequence);
        tracing::warn!(attempts = self.attempts.count(), "too many wrong passwords, raising alarm");
        self.channel.send_command(Command::TriggerAlarm)?;

        self.panel.clear();
        self.panel.display_text(screen::ERROR);
        run_alarm_window(&mut self.clock, self.config.alarm_ticks);

        self.attempts.reset();
        self.transition(FrontState::Idle);
        Ok(())
    }

    fn receive_verdict(&mut self) -> Result<Verdict, NodeError> {
        let reply = self.channel.receive_command()?;
        Verdict::from_command(reply)
            .ok_or(NodeError::UnexpectedCommand { expected: "MATCH or MISMATCH", received: reply })
    }

    fn collect_password(&mut self) -> Result<Password, NodeError> {
        let mut digits = [Digit::ZERO; PASSWORD_LEN];
        for slot in &mut digits {
            *slot = loop {
                match self.panel.read_key()? {
                    Key::Digit(digit) => break digit,
                    Key::Plus | Key::Minus | Key::Other(_) => {
                        tracing::trace!("non-digit key ignored during entry");
                    },
                }
            };
            self.panel.display_text(screen::MASK);
            self.panel.hold(self.config.key_hold);
        }
        Ok(Password::from_digits(digits))
    }

    fn prompt(&mut self, title: &str) {
        self.panel.clear();
        self.panel.display_text(title);
        self.panel.display_text_at(1, 0, screen::PASSWORD);
    }

    fn show_wrong_password(&mut self) {
        tracing::warn!(attempts = self.attempts.count(), "wrong password");
        self.panel.clear();
        self.panel.display_text(screen::WRONG_PASSWORD);
        self.panel.hold(self.config.message_hold);
        self.panel.clear();
    }

    fn recover(&mut self, err: &NodeError) {
        tracing::warn!(%err, state = ?self.state, "front node fault");
        if self.clock.is_armed() {
            self.clock.disarm();
        }

        self.panel.clear();
        self.panel.display_text(screen::ERROR);
        self.panel.hold(self.config.message_hold);

        if self.state != FrontState::AwaitingInitialSetup {
            self.transition(FrontState::Idle);
        }
    }

    fn transition(&mut self, next: FrontState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "front state");
            self.state = next;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::Arc,
        time::Duration,
    };

    use super::*;
    use crate::{
        env::TickHandler,
        error::{ChannelError, PanelError},
    };

    /// Link whose peer side is pre-scripted.
    #[derive(Default)]
    struct ScriptedLink {
        inbound: VecDeque<u8>,
        outbound: Vec<u8>,
    }

    impl ScriptedLink {
        fn replies(bytes: &[u8]) -> Self {
            Self { inbound: bytes.iter().copied().collect(), outbound: Vec::new() }
        }
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
    struct KeyScript {
        keys: VecDeque<Key>,
        screen: Vec<String>,
        holds: Vec<Duration>,
    }

    impl KeyScript {
        fn typed(text: &str) -> Self {
            Self { keys: text.chars().map(Key::from_char).collect(), ..Self::default() }
        }
    }

    impl Panel for KeyScript {
        fn clear(&mut self) {
            self.screen.clear();
        }

        fn display_text(&mut self, text: &str) {
            self.screen.push(text.to_owned());
        }

        fn display_text_at(&mut self, _row: u8, _col: u8, text: &str) {
            self.screen.push(text.to_owned());
        }

        fn read_key(&mut self) -> Result<Key, PanelError> {
            self.keys.pop_front().ok_or(PanelError::Disconnected)
        }

        fn hold(&mut self, duration: Duration) {
            self.holds.push(duration);
        }
    }

    fn provisioned(keys: &str, replies: &[u8]) -> FrontNode<ScriptedLink, StepTimer, KeyScript> {
        let mut node = FrontNode::new(
            ScriptedLink::replies(replies),
            StepTimer::default(),
            KeyScript::typed(keys),
            ApplianceConfig::default(),
        );
        node.state = FrontState::Idle;
        node
    }

    #[test]
    fn setup_sends_both_entries_then_completes() {
        let mut node = FrontNode::new(
            ScriptedLink::replies(&[0x01]),
            StepTimer::default(),
            KeyScript::typed("1234512345"),
            ApplianceConfig::default(),
        );

        assert_eq!(node.step().unwrap(), FrontOutcome::SetupComplete);
        assert_eq!(node.state(), FrontState::Idle);
        assert_eq!(
            node.channel.outbound,
            vec![1, 2, 3, 4, 5, b'#', 1, 2, 3, 4, 5, b'#']
        );
        let key_holds =
            node.panel().holds.iter().filter(|d| **d == Duration::from_millis(400)).count();
        assert_eq!(key_holds, 10);
    }

    #[test]
    fn setup_repeats_until_match() {
        let mut node = FrontNode::new(
            ScriptedLink::replies(&[0x00, 0x01]),
            StepTimer::default(),
            KeyScript::typed("11111222221111111111"),
            ApplianceConfig::default(),
        );

        node.initial_setup().unwrap();
        assert_eq!(node.state(), FrontState::Idle);
        assert_eq!(node.channel.outbound.len(), 24);
    }

    #[test]
    fn entry_skips_non_digit_keys_and_encodes_zero() {
        let mut node = provisioned("+1*0#2=034", &[0x00]);
        node.step().unwrap();
        assert_eq!(node.channel.outbound, vec![0x02, 1, 0xFF, 2, 0xFF, 3, b'#']);
    }

    #[test]
    fn menu_ignores_other_keys() {
        let mut node = provisioned("7", &[]);
        assert_eq!(node.step().unwrap(), FrontOutcome::KeyIgnored);
        assert!(node.channel.outbound.is_empty());
    }

    #[test]
    fn open_door_runs_handshake_and_sequence() {
        let mut node = provisioned("+12345", &[0x01, 0x05]);
        assert_eq!(node.step().unwrap(), FrontOutcome::DoorCycled);

        assert_eq!(node.channel.outbound, vec![0x02, 1, 2, 3, 4, 5, b'#', 0x05]);
        assert_eq!(node.panel().screen, vec![screen::DOOR_LOCKING.to_owned()]);
        assert!(!node.clock().is_armed());
        assert_eq!(node.state(), FrontState::Idle);
    }

    #[test]
    fn change_sends_replacement_after_match() {
        let mut node = provisioned("-1234554321", &[0x01]);
        assert_eq!(node.step().unwrap(), FrontOutcome::PasswordChanged);
        assert_eq!(
            node.channel.outbound,
            vec![0x03, 1, 2, 3, 4, 5, b'#', 5, 4, 3, 2, 1, b'#']
        );
    }

    #[test]
    fn third_mismatch_raises_alarm_and_resets() {
        let mut node = provisioned("+11111+11111-11111", &[0x00, 0x00, 0x00]);

        assert_eq!(node.step().unwrap(), FrontOutcome::WrongPassword { attempts: 1 });
        assert_eq!(node.step().unwrap(), FrontOutcome::WrongPassword { attempts: 2 });
        assert_eq!(node.step().unwrap(), FrontOutcome::AlarmRaised);

        assert_eq!(node.wrong_attempts(), 0);
        assert_eq!(node.channel.outbound.last(), Some(&0x04));
        assert_eq!(node.panel().screen, vec![screen::ERROR.to_owned()]);
    }

    #[test]
    fn match_clears_wrong_attempts() {
        let mut node = provisioned("+11111-12345", &[0x00, 0x01]);
        node.step().unwrap();
        assert_eq!(node.wrong_attempts(), 1);

        // Keypad runs out while collecting the replacement.
        assert!(node.step().unwrap_err().is_fatal());
        assert_eq!(node.wrong_attempts(), 0);
    }

    #[test]
    fn unexpected_reply_shows_error_and_returns_to_idle() {
        let mut node = provisioned("+12345", &[0x05]);
        let err = node.step().unwrap_err();

        assert_eq!(
            err,
            NodeError::UnexpectedCommand {
                expected: "MATCH or MISMATCH",
                received: Command::Ready
            }
        );
        assert_eq!(node.state(), FrontState::Idle);
        assert_eq!(node.panel().screen, vec![screen::ERROR.to_owned()]);
    }

    #[test]
    fn closed_link_stops_run() {
        let mut node = provisioned("+12345", &[]);
        assert_eq!(node.run().unwrap_err(), NodeError::Channel(ChannelError::Closed));
    }
}
