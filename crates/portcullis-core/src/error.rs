//! Node error types.

use std::time::Duration;

use portcullis_proto::{Command, ProtocolError};
use thiserror::Error;

/// Errors from the serial link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Peer end of the link is gone.
    #[error("serial link closed")]
    Closed,

    /// A bounded receive gave up. Only links configured with a timeout
    /// produce this; the protocol itself never times out.
    #[error("serial link stalled for {waited:?}")]
    TimedOut {
        /// How long the receive waited.
        waited: Duration,
    },
}

/// Errors from the persistent password store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Device failed to read a byte.
    #[error("read failed at {address:#06x}")]
    ReadFailed {
        /// Address being read.
        address: u16,
    },

    /// Device failed to write a byte.
    #[error("write failed at {address:#06x}")]
    WriteFailed {
        /// Address being written.
        address: u16,
    },

    /// Layout places the credential outside the device.
    #[error("address out of range: base {base:#06x} + {offset}")]
    AddressOutOfRange {
        /// Base address of the credential region.
        base: u16,
        /// Offset past the base.
        offset: usize,
    },

    /// Stored bytes do not decode to a password.
    #[error("stored credential is corrupt: {0}")]
    Corrupt(ProtocolError),
}

/// Errors from the keypad/display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    /// No more key presses will ever arrive.
    #[error("keypad disconnected")]
    Disconnected,
}

/// Errors raised by a control core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// Serial link failure.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Received bytes are not valid protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A valid opcode arrived that is not allowed in the current state.
    #[error("unexpected {received} while waiting for {expected}")]
    UnexpectedCommand {
        /// What the state machine was waiting for.
        expected: &'static str,
        /// What arrived instead.
        received: Command,
    },

    /// Password store failure.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Keypad/display failure.
    #[error("panel error: {0}")]
    Panel(#[from] PanelError),
}

impl NodeError {
    /// Returns true if the node cannot continue its control loop.
    ///
    /// Fatal errors mean a peripheral is gone for good. Everything else is
    /// logged and the loop returns to idle.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Channel(_) | Self::Panel(PanelError::Disconnected) => true,

            Self::Protocol(_) | Self::UnexpectedCommand { .. } | Self::Persistence(_) => false,
        }
    }
}
