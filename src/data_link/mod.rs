//! Data link layer for the PDM serial protocol.
//!
//! Every frame exchanged with the device has the same envelope:
//!
//! ```text
//! ┌────────┬──────────────┬─────────┬──────────┐
//! │ HEADER │ BODY         │ TRAILER │ CHECKSUM │
//! │ 2B     │ variable     │ 2B      │ 4B (LE)  │
//! └────────┴──────────────┴─────────┴──────────┘
//! ```
//!
//! The checksum is the wrapping 32-bit sum of every byte before it,
//! trailer included. Acknowledgments are single command bytes sent
//! outside of any frame.

pub mod assembler;
pub mod reader;

pub use assembler::FrameAssembler;
pub use reader::ByteReader;

use crate::error::{PdmError, Result};
use crate::types::FrameData;

pub const HEADER: [u8; 2] = [0x84, 0x19];
pub const HEADER_VALUE: u16 = u16::from_le_bytes(HEADER);
pub const TRAILER: [u8; 2] = [0x24, 0x20];
pub const CHECKSUM_LEN: usize = 4;

/// Header, command byte, trailer and checksum
pub const MIN_FRAME_LEN: usize = HEADER.len() + 1 + TRAILER.len() + CHECKSUM_LEN;

/// Wrapping 32-bit sum of all bytes
pub fn checksum(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| acc.wrapping_add(b as u32))
}

/// Checks the trailing checksum and returns the bytes it covers
pub fn verify_checksum(frame: &[u8]) -> Result<&[u8]> {
    if frame.len() < CHECKSUM_LEN {
        return Err(PdmError::FrameTooShort(frame.len()));
    }
    let (covered, tail) = frame.split_at(frame.len() - CHECKSUM_LEN);
    let received = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
    let computed = checksum(covered);
    if computed != received {
        return Err(PdmError::Checksum { computed, received });
    }
    Ok(covered)
}

/// Builds an outbound frame: header first, trailer and checksum on finish
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    data: FrameData,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuilder {
    pub fn new() -> Self {
        let mut data = Vec::with_capacity(16);
        data.extend_from_slice(&HEADER);
        Self { data }
    }

    pub fn push(mut self, byte: u8) -> Self {
        self.data.push(byte);
        self
    }

    pub fn extend(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn finish(mut self) -> FrameData {
        self.data.extend_from_slice(&TRAILER);
        let sum = checksum(&self.data);
        self.data.extend_from_slice(&sum.to_le_bytes());
        self.data
    }
}
