//! Portcullis host runtime.
//!
//! Runs both nodes of the appliance on a workstation:
//! - OS threads as tick interrupts
//! - An in-process byte pipe as the serial link
//! - RAM as EEPROM
//! - A scripted or stdin keypad, with the display rendered through `tracing`
//!
//! ## Architecture
//!
//! ```text
//! portcullis-host
//!   ├─ Appliance         (spawns and supervises both nodes)
//!   ├─ ThreadTimer       (real-time tick source)
//!   ├─ PipeLink          (serial link between the node threads)
//!   ├─ MemoryEeprom      (shared RAM-backed EEPROM)
//!   ├─ ConsolePanel      (keypad and 16x2 display)
//!   └─ LoggingActuators  (motor and buzzer journal)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod actuators;
mod eeprom;
mod error;
mod link;
mod panel;
mod timer;

use std::time::Duration;

pub use actuators::{ActuatorEvent, LoggingActuators};
pub use eeprom::{DEFAULT_CAPACITY, ERASED, MemoryEeprom};
pub use error::HostError;
pub use link::PipeLink;
pub use panel::{COLUMNS, ConsolePanel, ROWS};
use portcullis_core::{
    ApplianceConfig, BackNode, ChannelError, FrontNode, NodeError, PanelError, TICK_PERIOD,
};
pub use timer::ThreadTimer;

/// Runtime configuration for the host appliance.
#[derive(Debug, Clone)]
pub struct ApplianceRuntimeConfig {
    /// Period of both nodes' tick timers.
    pub tick_period: Duration,
    /// How long the front node waits for a reply from the back node.
    /// `None` waits forever. The back node always waits forever.
    pub link_timeout: Option<Duration>,
    /// Behaviour shared by both nodes.
    pub appliance: ApplianceConfig,
}

impl Default for ApplianceRuntimeConfig {
    fn default() -> Self {
        Self { tick_period: TICK_PERIOD, link_timeout: None, appliance: ApplianceConfig::default() }
    }
}

/// Both nodes wired together, ready to run.
pub struct Appliance {
    config: ApplianceRuntimeConfig,
    panel: ConsolePanel,
    eeprom: MemoryEeprom,
    actuators: LoggingActuators,
}

impl Appliance {
    /// Appliance with fresh EEPROM and an empty actuator journal.
    #[must_use]
    pub fn new(config: ApplianceRuntimeConfig, panel: ConsolePanel) -> Self {
        Self { config, panel, eeprom: MemoryEeprom::default(), actuators: LoggingActuators::new() }
    }

    /// Use existing EEPROM contents, e.g. to simulate a reboot.
    #[must_use]
    pub fn with_eeprom(mut self, eeprom: MemoryEeprom) -> Self {
        self.eeprom = eeprom;
        self
    }

    /// Handle onto the back node's EEPROM.
    pub fn eeprom(&self) -> MemoryEeprom {
        self.eeprom.clone()
    }

    /// Handle onto the back node's actuator journal.
    pub fn actuators(&self) -> LoggingActuators {
        self.actuators.clone()
    }

    /// Run both nodes until the keypad disconnects.
    ///
    /// Each node gets its own blocking thread and its own tick timer. When the
    /// front node stops, its end of the link is dropped and the back node
    /// stops on the closed link.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The tick period is zero
    /// - Either node stops for any reason other than orderly shutdown
    pub async fn run(self) -> Result<(), HostError> {
        let period = self.config.tick_period;
        if period.is_zero() {
            return Err(HostError::Config("tick period must be non-zero".to_string()));
        }

        let appliance = self.config.appliance;
        // The back node waits on the user between requests, so only the front
        // end gives up on a silent link.
        let (front_link, back_link) = PipeLink::pair();
        let front_link = front_link.with_timeout(self.config.link_timeout);

        let mut back = BackNode::new(
            back_link,
            ThreadTimer::new(period),
            self.eeprom,
            self.actuators,
            appliance,
        )
        .map_err(|source| HostError::Node { node: "back", source })?;
        let mut front = FrontNode::new(front_link, ThreadTimer::new(period), self.panel, appliance);

        tracing::info!(?period, policy = ?appliance.store.policy, "appliance starting");

        let back_task = tokio::task::spawn_blocking(move || back.run());
        let front_task = tokio::task::spawn_blocking(move || front.run());

        let front_result = front_task
            .await
            .map_err(|e| HostError::Join { node: "front", reason: e.to_string() })?;
        let back_result = back_task
            .await
            .map_err(|e| HostError::Join { node: "back", reason: e.to_string() })?;

        match front_result {
            Ok(never) => match never {},
            Err(NodeError::Panel(PanelError::Disconnected)) => {
                tracing::info!("keypad disconnected, front node stopped");
            },
            Err(source) => return Err(HostError::Node { node: "front", source }),
        }

        match back_result {
            Ok(never) => match never {},
            Err(NodeError::Channel(ChannelError::Closed)) => {
                tracing::info!("link closed, back node stopped");
            },
            Err(source) => return Err(HostError::Node { node: "back", source }),
        }

        Ok(())
    }
}
