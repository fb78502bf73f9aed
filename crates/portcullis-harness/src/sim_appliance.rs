//! Both nodes wired together under simulated time.
//!
//! The front node runs on the caller's thread and is stepped explicitly. The
//! back node runs on its own thread, exactly as on the real appliance, and
//! reports every serviced exchange back to the simulation. A step returns only
//! once the back node has finished its side of the exchange, so assertions
//! never race the back thread.

use std::{
    sync::mpsc::{self, Receiver},
    thread::{self, JoinHandle},
    time::Duration,
};

use portcullis_core::{
    ApplianceConfig, BackNode, BackOutcome, ChannelError, CredentialStore, FrontNode,
    FrontOutcome, FrontState, NodeError, StoreError,
};
use portcullis_host::PipeLink;
use portcullis_proto::Password;

use crate::{ChaoticEeprom, RecordingActuators, ScriptedPanel, SimTimer};

/// Longest the simulation waits on the back node. Only reached on a bug.
pub const LINK_TIMEOUT: Duration = Duration::from_secs(5);

/// Front node as simulated.
pub type SimFront = FrontNode<PipeLink, SimTimer, ScriptedPanel>;

/// Back node as simulated.
pub type SimBack = BackNode<PipeLink, SimTimer, ChaoticEeprom, RecordingActuators>;

/// Back node returned by [`SimAppliance::shutdown`].
pub struct BackShutdown {
    /// The node, for post-mortem inspection.
    pub node: SimBack,
    /// The fatal error that ended its loop.
    pub reason: NodeError,
}

/// Deterministic two-node appliance.
pub struct SimAppliance {
    config: ApplianceConfig,
    front: SimFront,
    back: JoinHandle<BackShutdown>,
    back_results: Receiver<Result<BackOutcome, NodeError>>,
    back_log: Vec<Result<BackOutcome, NodeError>>,
    panel: ScriptedPanel,
    eeprom: ChaoticEeprom,
    actuators: RecordingActuators,
    front_timer: SimTimer,
    back_timer: SimTimer,
}

impl SimAppliance {
    /// Wire both nodes over `eeprom` and start the back node's thread.
    pub fn new(config: ApplianceConfig, eeprom: ChaoticEeprom) -> Result<Self, NodeError> {
        let (front_link, back_link) = PipeLink::pair();
        let front_link = front_link.with_timeout(Some(LINK_TIMEOUT));

        let panel = ScriptedPanel::new();
        let front_timer = SimTimer::new();
        let back_timer = SimTimer::new();
        let actuators = RecordingActuators::new(back_timer.clone());

        let mut back = BackNode::new(
            back_link,
            back_timer.clone(),
            eeprom.clone(),
            actuators.clone(),
            config,
        )?;
        let front = FrontNode::new(front_link, front_timer.clone(), panel.clone(), config);

        let (results_tx, back_results) = mpsc::channel();
        let back = thread::spawn(move || {
            loop {
                match back.step() {
                    Err(reason) if reason.is_fatal() => return BackShutdown { node: back, reason },
                    result => {
                        let _ = results_tx.send(result);
                    },
                }
            }
        });

        Ok(Self {
            config,
            front,
            back,
            back_results,
            back_log: Vec::new(),
            panel,
            eeprom,
            actuators,
            front_timer,
            back_timer,
        })
    }

    /// Fault-free appliance with no hold or settle delays.
    pub fn fresh(seed: u64) -> Result<Self, NodeError> {
        Self::new(ApplianceConfig::without_delays(), ChaoticEeprom::new(seed))
    }

    /// Queue key presses on the front panel.
    pub fn press(&self, keys: &str) {
        self.panel.press(keys);
    }

    /// Step the front node once and wait for the back node to finish its side.
    pub fn step(&mut self) -> Result<FrontOutcome, NodeError> {
        let outcome = self.front.step()?;

        for _ in 0..back_exchanges(outcome) {
            let result = self
                .back_results
                .recv_timeout(LINK_TIMEOUT)
                .map_err(|_| ChannelError::TimedOut { waited: LINK_TIMEOUT })?;
            if let Err(err) = &result {
                tracing::debug!(%err, "back node reported");
            }
            self.back_log.push(result);
        }

        Ok(outcome)
    }

    /// Press `keys` and step until they are consumed.
    pub fn drive(&mut self, keys: &str) -> Result<Vec<FrontOutcome>, NodeError> {
        self.press(keys);
        let mut outcomes = Vec::new();
        while self.panel.pending_keys() > 0 {
            outcomes.push(self.step()?);
        }
        Ok(outcomes)
    }

    /// Provision `password` by entering it twice.
    pub fn provision(&mut self, password: &Password) -> Result<FrontOutcome, NodeError> {
        let keys = keys_for(password);
        self.press(&keys);
        self.press(&keys);
        self.step()
    }

    /// Password the back node's store currently holds.
    pub fn stored_password(&self) -> Result<Password, StoreError> {
        CredentialStore::open(self.eeprom.memory(), self.config.store)?.load()
    }

    /// Front node.
    pub fn front(&self) -> &SimFront {
        &self.front
    }

    /// Front state.
    pub fn front_state(&self) -> FrontState {
        self.front.state()
    }

    /// Keypad and display transcript.
    pub fn panel(&self) -> &ScriptedPanel {
        &self.panel
    }

    /// Back node's EEPROM, faults included.
    pub fn eeprom(&self) -> &ChaoticEeprom {
        &self.eeprom
    }

    /// Back node's actuator journal.
    pub fn actuators(&self) -> &RecordingActuators {
        &self.actuators
    }

    /// Front node's timer.
    pub fn front_timer(&self) -> &SimTimer {
        &self.front_timer
    }

    /// Back node's timer.
    pub fn back_timer(&self) -> &SimTimer {
        &self.back_timer
    }

    /// Every exchange the back node has reported, oldest first.
    pub fn back_log(&self) -> &[Result<BackOutcome, NodeError>] {
        &self.back_log
    }

    /// Close the link and collect the back node.
    pub fn shutdown(self) -> BackShutdown {
        drop(self.front);
        match self.back.join() {
            Ok(shutdown) => shutdown,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

/// Keypad keys that enter `password`.
pub fn keys_for(password: &Password) -> String {
    password.values().iter().map(|v| char::from(b'0' + v)).collect()
}

/// Back node exchanges that complete within one front outcome.
fn back_exchanges(outcome: FrontOutcome) -> usize {
    match outcome {
        FrontOutcome::KeyIgnored => 0,
        FrontOutcome::SetupRetry
        | FrontOutcome::SetupComplete
        | FrontOutcome::WrongPassword { .. }
        | FrontOutcome::DoorCycled
        | FrontOutcome::PasswordChanged => 1,
        FrontOutcome::AlarmRaised => 2,
    }
}
