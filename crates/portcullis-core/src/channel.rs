//! Serial link between the two nodes.

use portcullis_proto::{Command, Password, SequenceDecoder, encode_digit_sequence};

use crate::error::{ChannelError, NodeError};

/// Blocking byte link with the protocol's message shapes layered on top.
///
/// Implementors provide the two byte primitives. Both block until the link
/// has accepted or produced a byte; an unresponsive peer stalls the caller.
pub trait SerialChannel {
    /// Transmit one byte.
    fn send_byte(&mut self, byte: u8) -> Result<(), ChannelError>;

    /// Receive one byte.
    fn receive_byte(&mut self) -> Result<u8, ChannelError>;

    /// Transmit a single-opcode message.
    fn send_command(&mut self, command: Command) -> Result<(), ChannelError> {
        tracing::debug!(%command, "send");
        self.send_byte(command.to_u8())
    }

    /// Receive a single-opcode message.
    fn receive_command(&mut self) -> Result<Command, NodeError> {
        let byte = self.receive_byte()?;
        let command = Command::try_from(byte)?;
        tracing::debug!(%command, "receive");
        Ok(command)
    }

    /// Transmit a digit-sequence message (digits then terminator).
    fn send_password(&mut self, password: &Password) -> Result<(), ChannelError> {
        tracing::debug!("send digit sequence");
        for &byte in encode_digit_sequence(password).iter() {
            self.send_byte(byte)?;
        }
        Ok(())
    }

    /// Receive a digit-sequence message, reading until the terminator.
    ///
    /// A malformed message is consumed through its terminator before the
    /// error is returned.
    fn receive_password(&mut self) -> Result<Password, NodeError> {
        let mut decoder = SequenceDecoder::new();
        loop {
            let byte = self.receive_byte()?;
            if let Some(password) = decoder.push(byte)? {
                tracing::debug!("receive digit sequence");
                return Ok(password);
            }
        }
    }
}

impl<C: SerialChannel + ?Sized> SerialChannel for &mut C {
    fn send_byte(&mut self, byte: u8) -> Result<(), ChannelError> {
        (**self).send_byte(byte)
    }

    fn receive_byte(&mut self) -> Result<u8, ChannelError> {
        (**self).receive_byte()
    }
}
