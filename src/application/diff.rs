use super::decoder::frame_body;
use crate::data_link::{ByteReader, FrameBuilder};
use crate::error::{PdmError, Result};
use crate::model::{Address, Domain, FieldValue, Slot, Snapshot};
use crate::types::{Command, FrameData, NUM_OUTPUT_CHANNELS};

// Channel parameter slot the device reuses for the momentary override state
pub const OVERRIDE_PARAMETER: u8 = 1;

/// What to send for one address of a push cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Field differs: NEWCONFIG followed by an update frame
    Send { address: Address, frame: FrameData },
    /// Field already matches: a bare SKIP
    Skip { address: Address },
}

impl Step {
    pub fn address(&self) -> Address {
        match self {
            Step::Send { address, .. } | Step::Skip { address } => *address,
        }
    }

    pub fn command(&self) -> Command {
        match self {
            Step::Send { .. } => Command::NewConfig,
            Step::Skip { .. } => Command::Skip,
        }
    }
}

/// Encodes one configuration update frame:
/// header, domain, parameter, item (omitted for system parameters),
/// 4-byte value slot, trailer, checksum.
pub fn encode_update(address: Address, slot: Slot) -> FrameData {
    let mut builder = FrameBuilder::new()
        .push(address.domain as u8)
        .push(address.parameter);
    if address.domain.has_item_byte() {
        builder = builder.push(address.item);
    }
    builder.extend(&slot).finish()
}

/// Parses an update frame produced by [`encode_update`]
pub fn decode_update(frame: &[u8]) -> Result<(Address, Slot)> {
    let body = frame_body(frame)?;
    let mut reader = ByteReader::new(body);
    let domain = Domain::try_from(reader.read_u8()?)?;
    let parameter = reader.read_u8()?;
    let item = if domain.has_item_byte() {
        reader.read_u8()?
    } else {
        0
    };
    let slot = reader.read_array()?;
    if reader.remaining() != 0 {
        return Err(PdmError::Schema(format!(
            "{} unexpected bytes in update frame",
            reader.remaining()
        )));
    }
    Ok((Address::new(domain, parameter, item)?, slot))
}

/// Momentary on/off override for one output channel
pub fn encode_override(channel: u8, state: bool) -> Result<FrameData> {
    if channel as usize >= NUM_OUTPUT_CHANNELS {
        return Err(PdmError::InvalidParameter(format!(
            "channel {channel} out of range"
        )));
    }
    let address = Address {
        domain: Domain::Channel,
        parameter: OVERRIDE_PARAMETER,
        item: channel,
    };
    Ok(encode_update(address, FieldValue::Flag(state).to_slot()))
}

/// Compares one field of `live` against `desired`
pub fn next_step(live: &Snapshot, desired: &Snapshot, address: Address) -> Result<Step> {
    let wanted = desired.field(address)?;
    if live.field(address)?.same_as(wanted) {
        Ok(Step::Skip { address })
    } else {
        Ok(Step::Send {
            address,
            frame: encode_update(address, wanted.to_slot()),
        })
    }
}

/// Position of a push cycle over the address space.
/// Only advanced on the device's CONFIRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    position: Option<Address>,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            position: Some(Address::FIRST),
        }
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` once every address has been visited
    pub fn current(&self) -> Option<Address> {
        self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.position.is_none()
    }

    /// Moves to the next address; returns false when the cycle is complete
    pub fn advance(&mut self) -> bool {
        self.position = self.position.and_then(Address::next);
        self.position.is_some()
    }

    pub fn reset(&mut self) {
        self.position = Some(Address::FIRST);
    }
}

/// Walks the address space one field at a time, producing SEND or SKIP steps
#[derive(Debug, Clone, Default)]
pub struct ConfigDiff {
    cursor: Cursor,
}

impl ConfigDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Step for the current address, `None` once the cursor is exhausted
    pub fn step(&self, live: &Snapshot, desired: &Snapshot) -> Result<Option<Step>> {
        self.cursor
            .current()
            .map(|address| next_step(live, desired, address))
            .transpose()
    }

    pub fn advance(&mut self) -> bool {
        self.cursor.advance()
    }

    pub fn reset(&mut self) {
        self.cursor.reset();
    }
}
