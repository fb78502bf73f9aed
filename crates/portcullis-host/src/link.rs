//! In-process serial link.

use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    time::Duration,
};

use portcullis_core::{ChannelError, SerialChannel};

/// One end of a full-duplex byte pipe between two node threads.
///
/// Bytes arrive in order and are never lost. Dropping one end closes the link
/// for the other.
pub struct PipeLink {
    tx: Sender<u8>,
    rx: Receiver<u8>,
    timeout: Option<Duration>,
}

impl PipeLink {
    /// Connected pair of ends that block indefinitely on receive.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        Self::pair_with_timeout(None)
    }

    /// Connected pair whose receives give up after `timeout`.
    #[must_use]
    pub fn pair_with_timeout(timeout: Option<Duration>) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel();
        let (b_tx, a_rx) = mpsc::channel();

        (Self { tx: a_tx, rx: a_rx, timeout }, Self { tx: b_tx, rx: b_rx, timeout })
    }

    /// Change this end's receive timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl SerialChannel for PipeLink {
    fn send_byte(&mut self, byte: u8) -> Result<(), ChannelError> {
        tracing::trace!(byte = format_args!("{byte:#04x}"), "tx");
        self.tx.send(byte).map_err(|_| ChannelError::Closed)
    }

    fn receive_byte(&mut self) -> Result<u8, ChannelError> {
        let byte = match self.timeout {
            None => self.rx.recv().map_err(|_| ChannelError::Closed)?,
            Some(waited) => self.rx.recv_timeout(waited).map_err(|e| match e {
                RecvTimeoutError::Timeout => ChannelError::TimedOut { waited },
                RecvTimeoutError::Disconnected => ChannelError::Closed,
            })?,
        };
        tracing::trace!(byte = format_args!("{byte:#04x}"), "rx");
        Ok(byte)
    }
}
