use crate::error::{PdmError, Result};

/// Number of output channels reported by the device
pub const NUM_OUTPUT_CHANNELS: usize = 14;

/// Number of analogue inputs reported by the device
pub const NUM_ANALOGUE_INPUTS: usize = 8;

/// Number of digital inputs on the device
pub const NUM_DIGITAL_INPUTS: usize = 8;

/// Fixed length of a channel name on the wire
pub const CHANNEL_NAME_LENGTH: usize = 3;

/// Generic frame data type
pub type FrameData = Vec<u8>;

/// Configuration trait that must be implemented by all engine and transport configurations
pub trait Config: Send + Sync {
    fn validate(&self) -> Result<()>;
}

/// Single-byte commands exchanged outside of frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Begin,
    Confirm,
    Request,
    NewConfig,
    Skip,
    Send,
    ChecksumFail,
    SaveChanges,
    FirmwareVersion,
    BuildDate,
}

impl Command {
    pub const fn code(self) -> u8 {
        match self {
            Command::Begin => b'b',
            Command::Confirm => b'c',
            Command::Request => b'r',
            Command::NewConfig => b'n',
            Command::Skip => b'k',
            Command::Send => b's',
            Command::ChecksumFail => b'f',
            Command::SaveChanges => b'S',
            Command::FirmwareVersion => b'v',
            Command::BuildDate => b'd',
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'b' => Some(Command::Begin),
            b'c' => Some(Command::Confirm),
            b'r' => Some(Command::Request),
            b'n' => Some(Command::NewConfig),
            b'k' => Some(Command::Skip),
            b's' => Some(Command::Send),
            b'f' => Some(Command::ChecksumFail),
            b'S' => Some(Command::SaveChanges),
            b'v' => Some(Command::FirmwareVersion),
            b'd' => Some(Command::BuildDate),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = PdmError;

    fn try_from(code: u8) -> Result<Self> {
        Command::from_code(code)
            .ok_or_else(|| PdmError::InvalidParameter(format!("unknown command byte {code:#04x}")))
    }
}
