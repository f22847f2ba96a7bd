//! Per-domain field tables.
//!
//! Each configurable field travels in a fixed 4-byte slot, little-endian and
//! right-padded with zeros when the field is narrower. Two values are the same
//! field value exactly when their slots are byte-identical, which makes float
//! comparison a bit-pattern comparison.

use super::channel::{Channel, ChannelType};
use super::inputs::{AnalogueInput, DigitalInput};
use super::system::{DistanceUnit, SpeedUnit, SystemParameters};
use crate::error::{PdmError, Result};

pub type Slot = [u8; 4];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Byte(u8),
    Flag(bool),
    Float(f32),
    Int(i32),
    Word(u16),
    DWord(u32),
    Name([u8; 3]),
    Pair(u8, u8),
}

impl FieldValue {
    pub fn to_slot(self) -> Slot {
        match self {
            FieldValue::Byte(v) => [v, 0, 0, 0],
            FieldValue::Flag(v) => [v as u8, 0, 0, 0],
            FieldValue::Float(v) => v.to_le_bytes(),
            FieldValue::Int(v) => v.to_le_bytes(),
            FieldValue::Word(v) => {
                let [lo, hi] = v.to_le_bytes();
                [lo, hi, 0, 0]
            }
            FieldValue::DWord(v) => v.to_le_bytes(),
            FieldValue::Name([a, b, c]) => [a, b, c, 0],
            FieldValue::Pair(a, b) => [a, b, 0, 0],
        }
    }

    /// Equality as transmitted
    pub fn same_as(self, other: FieldValue) -> bool {
        self.to_slot() == other.to_slot()
    }
}

fn slot_u16(slot: Slot) -> u16 {
    u16::from_le_bytes([slot[0], slot[1]])
}

fn unknown_parameter(what: &str, parameter: u8) -> PdmError {
    PdmError::InvalidParameter(format!("no {what} field {parameter}"))
}

impl Channel {
    pub fn field(&self, parameter: u8) -> Result<FieldValue> {
        Ok(match parameter {
            0 => FieldValue::Byte(self.channel_type as u8),
            1 => FieldValue::Float(self.current_limit_high),
            2 => FieldValue::Float(self.current_threshold_high),
            3 => FieldValue::Float(self.current_threshold_low),
            4 => FieldValue::Flag(self.enabled),
            5 => FieldValue::Byte(self.group_number),
            6 => FieldValue::Byte(self.input_control_pin),
            7 => FieldValue::Byte(self.multi_channel),
            8 => FieldValue::Byte(self.retry_count),
            9 => FieldValue::Int(self.inrush_delay_ms),
            10 => FieldValue::Name(self.name),
            11 => FieldValue::Flag(self.run_on),
            12 => FieldValue::Int(self.run_on_time_ms),
            _ => return Err(unknown_parameter("channel", parameter)),
        })
    }

    pub fn apply_field(&mut self, parameter: u8, slot: Slot) -> Result<()> {
        match parameter {
            0 => self.channel_type = ChannelType::try_from(slot[0])?,
            1 => self.current_limit_high = f32::from_le_bytes(slot),
            2 => self.current_threshold_high = f32::from_le_bytes(slot),
            3 => self.current_threshold_low = f32::from_le_bytes(slot),
            4 => self.enabled = slot[0] != 0,
            5 => self.group_number = slot[0],
            6 => self.input_control_pin = slot[0],
            7 => self.multi_channel = slot[0],
            8 => self.retry_count = slot[0],
            9 => self.inrush_delay_ms = i32::from_le_bytes(slot),
            10 => self.name = [slot[0], slot[1], slot[2]],
            11 => self.run_on = slot[0] != 0,
            12 => self.run_on_time_ms = i32::from_le_bytes(slot),
            _ => return Err(unknown_parameter("channel", parameter)),
        }
        Ok(())
    }
}

impl AnalogueInput {
    pub fn field(&self, parameter: u8) -> Result<FieldValue> {
        Ok(match parameter {
            0 => FieldValue::Flag(self.pull_up_enable),
            1 => FieldValue::Flag(self.pull_down_enable),
            2 => FieldValue::Flag(self.is_digital),
            3 => FieldValue::Flag(self.is_threshold),
            4 => FieldValue::Float(self.on_threshold),
            5 => FieldValue::Float(self.off_threshold),
            6 => FieldValue::Float(self.input_scale_low),
            7 => FieldValue::Float(self.input_scale_high),
            8 => FieldValue::Byte(self.pwm_low_value),
            9 => FieldValue::Byte(self.pwm_high_value),
            _ => return Err(unknown_parameter("analogue input", parameter)),
        })
    }

    pub fn apply_field(&mut self, parameter: u8, slot: Slot) -> Result<()> {
        match parameter {
            0 => self.pull_up_enable = slot[0] != 0,
            1 => self.pull_down_enable = slot[0] != 0,
            2 => self.is_digital = slot[0] != 0,
            3 => self.is_threshold = slot[0] != 0,
            4 => self.on_threshold = f32::from_le_bytes(slot),
            5 => self.off_threshold = f32::from_le_bytes(slot),
            6 => self.input_scale_low = f32::from_le_bytes(slot),
            7 => self.input_scale_high = f32::from_le_bytes(slot),
            8 => self.pwm_low_value = slot[0],
            9 => self.pwm_high_value = slot[0],
            _ => return Err(unknown_parameter("analogue input", parameter)),
        }
        Ok(())
    }
}

impl SystemParameters {
    pub fn field(&self, parameter: u8) -> Result<FieldValue> {
        Ok(match parameter {
            0 => FieldValue::Flag(self.can_termination),
            1 => FieldValue::Float(self.system_current_limit),
            2 => FieldValue::Word(self.channel_data_can_id),
            3 => FieldValue::Word(self.system_data_can_id),
            4 => FieldValue::Word(self.config_data_can_id),
            5 => FieldValue::DWord(self.imu_wake_window_ms),
            6 => FieldValue::Pair(self.speed_unit as u8, self.distance_unit as u8),
            7 => FieldValue::Flag(self.allow_data),
            8 => FieldValue::Flag(self.allow_gps),
            _ => return Err(unknown_parameter("system", parameter)),
        })
    }

    pub fn apply_field(&mut self, parameter: u8, slot: Slot) -> Result<()> {
        match parameter {
            0 => self.can_termination = slot[0] != 0,
            1 => self.system_current_limit = f32::from_le_bytes(slot),
            2 => self.channel_data_can_id = slot_u16(slot),
            3 => self.system_data_can_id = slot_u16(slot),
            4 => self.config_data_can_id = slot_u16(slot),
            5 => self.imu_wake_window_ms = u32::from_le_bytes(slot),
            6 => {
                self.speed_unit = SpeedUnit::from(slot[0]);
                self.distance_unit = DistanceUnit::from(slot[1]);
            }
            7 => self.allow_data = slot[0] != 0,
            8 => self.allow_gps = slot[0] != 0,
            _ => return Err(unknown_parameter("system", parameter)),
        }
        Ok(())
    }
}

impl DigitalInput {
    pub fn field(&self, parameter: u8) -> Result<FieldValue> {
        match parameter {
            0 => Ok(FieldValue::Flag(self.active_high)),
            _ => Err(unknown_parameter("digital input", parameter)),
        }
    }

    pub fn apply_field(&mut self, parameter: u8, slot: Slot) -> Result<()> {
        match parameter {
            0 => self.active_high = slot[0] != 0,
            _ => return Err(unknown_parameter("digital input", parameter)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_fields_are_right_padded() {
        assert_eq!(FieldValue::Flag(true).to_slot(), [1, 0, 0, 0]);
        assert_eq!(FieldValue::Word(0x0123).to_slot(), [0x23, 0x01, 0, 0]);
        assert_eq!(FieldValue::Name(*b"FAN").to_slot(), [b'F', b'A', b'N', 0]);
        assert_eq!(FieldValue::Pair(1, 0).to_slot(), [1, 0, 0, 0]);
        assert_eq!(FieldValue::Int(-1).to_slot(), [0xFF; 4]);
    }

    #[test]
    fn floats_compare_by_bit_pattern() {
        assert!(!FieldValue::Float(0.0).same_as(FieldValue::Float(-0.0)));
        assert!(FieldValue::Float(f32::NAN).same_as(FieldValue::Float(f32::NAN)));
        assert!(!FieldValue::Float(0.1).same_as(FieldValue::Float(0.1 + f32::EPSILON)));
    }

    #[test]
    fn bool_and_byte_with_same_slot_are_equal() {
        assert!(FieldValue::Flag(true).same_as(FieldValue::Byte(1)));
    }

    #[test]
    fn unknown_parameters_are_rejected() {
        assert!(Channel::default().field(13).is_err());
        assert!(AnalogueInput::default().apply_field(10, [0; 4]).is_err());
        assert!(SystemParameters::default().field(9).is_err());
        assert!(DigitalInput::default().field(1).is_err());
    }

    #[test]
    fn invalid_channel_type_leaves_record_untouched() {
        let mut channel = Channel::default();
        assert!(channel.apply_field(0, [9, 0, 0, 0]).is_err());
        assert_eq!(channel, Channel::default());
    }
}
