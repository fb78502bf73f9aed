//! Digit-sequence framing.
//!
//! A password crosses the link as five encoded digit bytes followed by
//! [`TERMINATOR`]. The passive side reads until it sees the terminator.
//!
//! ```text
//! +----+----+----+----+----+-----+
//! | d0 | d1 | d2 | d3 | d4 | '#' |
//! +----+----+----+----+----+-----+
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Digit, PASSWORD_LEN, Password, ProtocolError};

/// End-of-message byte for digit sequences.
pub const TERMINATOR: u8 = b'#';

/// Wire byte standing in for the digit 0.
pub const ZERO_SENTINEL: u8 = 0xFF;

/// Encoded length of a digit-sequence message, terminator included.
pub const DIGIT_SEQUENCE_LEN: usize = PASSWORD_LEN + 1;

/// Encode a password as a digit-sequence message.
pub fn encode_digit_sequence(password: &Password) -> Bytes {
    let mut buf = BytesMut::with_capacity(DIGIT_SEQUENCE_LEN);
    buf.put_slice(&password.encoded());
    buf.put_u8(TERMINATOR);
    buf.freeze()
}

/// Incremental decoder for one digit-sequence message.
///
/// Feed received bytes with [`SequenceDecoder::push`] until it yields a
/// result. Errors are reported only once the terminator has been consumed, so
/// after any result the byte stream is positioned at the next message.
#[derive(Debug, Default)]
pub struct SequenceDecoder {
    digits: [u8; PASSWORD_LEN],
    len: usize,
    error: Option<ProtocolError>,
}

impl SequenceDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes consumed so far in the current message.
    pub const fn consumed(&self) -> usize {
        self.len
    }

    /// Consume one byte.
    ///
    /// Returns `Ok(None)` while the message is incomplete. On the terminator
    /// returns the decoded password or the first error seen in the message,
    /// and resets for the next message.
    pub fn push(&mut self, byte: u8) -> Result<Option<Password>, ProtocolError> {
        if byte == TERMINATOR {
            return self.finish().map(Some);
        }

        if self.error.is_none() {
            if self.len >= PASSWORD_LEN {
                self.error =
                    Some(ProtocolError::WrongLength { len: self.len + 1, expected: PASSWORD_LEN });
            } else if let Err(e) = Digit::decode(byte) {
                self.error = Some(e);
            } else {
                self.digits[self.len] = byte;
            }
        }

        self.len = self.len.saturating_add(1);
        Ok(None)
    }

    fn finish(&mut self) -> Result<Password, ProtocolError> {
        let len = std::mem::take(&mut self.len);
        let error = self.error.take();

        match error {
            Some(ProtocolError::WrongLength { expected, .. }) => {
                Err(ProtocolError::WrongLength { len, expected })
            },
            Some(e) => Err(e),
            None if len != PASSWORD_LEN => {
                Err(ProtocolError::WrongLength { len, expected: PASSWORD_LEN })
            },
            None => Password::decode(self.digits),
        }
    }
}
