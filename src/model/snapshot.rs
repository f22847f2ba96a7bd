use super::address::{Address, Domain};
use super::channel::Channel;
use super::fields::{FieldValue, Slot};
use super::inputs::{AnalogueInput, DigitalInput};
use super::system::{SystemParameters, MAX_STANDARD_CAN_ID};
use crate::error::{PdmError, Result};
use crate::types::{Config, NUM_ANALOGUE_INPUTS, NUM_DIGITAL_INPUTS, NUM_OUTPUT_CHANNELS};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete device state: the live copy reported by the device or the
/// desired copy a consumer wants pushed to it
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    pub channels: [Channel; NUM_OUTPUT_CHANNELS],
    pub analogue_inputs: [AnalogueInput; NUM_ANALOGUE_INPUTS],
    pub digital_inputs: [DigitalInput; NUM_DIGITAL_INPUTS],
    pub system: SystemParameters,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&self, address: Address) -> Result<FieldValue> {
        let item = address.item as usize;
        match address.domain {
            Domain::Channel => self.channel(item)?.field(address.parameter),
            Domain::AnalogueInput => self.analogue_input(item)?.field(address.parameter),
            Domain::SystemParameter => self.system.field(address.parameter),
            Domain::DigitalInput => self.digital_input(item)?.field(address.parameter),
        }
    }

    /// Writes one encoded field into the addressed record
    pub fn apply(&mut self, address: Address, slot: Slot) -> Result<()> {
        let item = address.item as usize;
        match address.domain {
            Domain::Channel => self
                .channels
                .get_mut(item)
                .ok_or_else(|| out_of_range("channel", item))?
                .apply_field(address.parameter, slot),
            Domain::AnalogueInput => self
                .analogue_inputs
                .get_mut(item)
                .ok_or_else(|| out_of_range("analogue input", item))?
                .apply_field(address.parameter, slot),
            Domain::SystemParameter => self.system.apply_field(address.parameter, slot),
            Domain::DigitalInput => self
                .digital_inputs
                .get_mut(item)
                .ok_or_else(|| out_of_range("digital input", item))?
                .apply_field(address.parameter, slot),
        }
    }

    pub fn channel(&self, index: usize) -> Result<&Channel> {
        self.channels
            .get(index)
            .ok_or_else(|| out_of_range("channel", index))
    }

    pub fn analogue_input(&self, index: usize) -> Result<&AnalogueInput> {
        self.analogue_inputs
            .get(index)
            .ok_or_else(|| out_of_range("analogue input", index))
    }

    pub fn digital_input(&self, index: usize) -> Result<&DigitalInput> {
        self.digital_inputs
            .get(index)
            .ok_or_else(|| out_of_range("digital input", index))
    }

    pub fn has_any_error(&self) -> bool {
        self.system.has_any_error() || self.channels.iter().any(Channel::has_any_error)
    }
}

fn out_of_range(what: &str, index: usize) -> PdmError {
    PdmError::InvalidParameter(format!("{what} {index} out of range"))
}

impl Config for Snapshot {
    fn validate(&self) -> Result<()> {
        for id in self.system.can_ids() {
            if id > MAX_STANDARD_CAN_ID {
                return Err(PdmError::InvalidParameter(format!(
                    "CAN ID {id:#x} exceeds 11 bits"
                )));
            }
        }
        for (index, input) in self.analogue_inputs.iter().enumerate() {
            if input.pull_up_enable && input.pull_down_enable {
                return Err(PdmError::InvalidParameter(format!(
                    "analogue input {index} has both pull-up and pull-down enabled"
                )));
            }
        }
        for (index, channel) in self.channels.iter().enumerate() {
            if !channel
                .name
                .iter()
                .all(|&b| b == 0 || b.is_ascii_graphic() || b == b' ')
            {
                return Err(PdmError::InvalidParameter(format!(
                    "channel {index} name is not printable ASCII"
                )));
            }
        }
        Ok(())
    }
}
