//! Control opcodes.

use crate::ProtocolError;

/// Opcode exchanged between the two nodes.
///
/// Values are wire constants. Identity matters, ordering does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Candidate password does not match the stored one.
    Mismatch = 0x00,
    /// Candidate password matches the stored one.
    Match = 0x01,
    /// Front asks to run the door sequence. A digit-sequence follows.
    OpenDoorRequest = 0x02,
    /// Front asks to replace the password. A digit-sequence follows.
    ChangePasswordRequest = 0x03,
    /// Front asks the back node to sound the alarm.
    TriggerAlarm = 0x04,
    /// Timing handshake that brackets the start of the door sequence.
    Ready = 0x05,
}

impl Command {
    /// Every opcode, in wire order.
    pub const ALL: [Self; 6] = [
        Self::Mismatch,
        Self::Match,
        Self::OpenDoorRequest,
        Self::ChangePasswordRequest,
        Self::TriggerAlarm,
        Self::Ready,
    ];

    /// Decode a wire byte. `None` for bytes outside the opcode set.
    pub const fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Mismatch),
            0x01 => Some(Self::Match),
            0x02 => Some(Self::OpenDoorRequest),
            0x03 => Some(Self::ChangePasswordRequest),
            0x04 => Some(Self::TriggerAlarm),
            0x05 => Some(Self::Ready),
            _ => None,
        }
    }

    /// Wire byte for this opcode.
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Verdict opcode for a comparison result.
    pub const fn verdict(matched: bool) -> Self {
        if matched { Self::Match } else { Self::Mismatch }
    }

    /// True for the two verdict opcodes.
    pub const fn is_verdict(self) -> bool {
        matches!(self, Self::Match | Self::Mismatch)
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_u8(byte).ok_or(ProtocolError::UnknownOpcode(byte))
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.to_u8()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Mismatch => "MISMATCH",
            Self::Match => "MATCH",
            Self::OpenDoorRequest => "OPEN_DOOR",
            Self::ChangePasswordRequest => "CHANGE_PASSWORD",
            Self::TriggerAlarm => "TRIGGER_ALARM",
            Self::Ready => "READY",
        };
        write!(f, "{name}({:#04x})", self.to_u8())
    }
}
