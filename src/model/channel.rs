use crate::error::{PdmError, Result};
use crate::types::CHANNEL_NAME_LENGTH;
use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Output channel control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum ChannelType {
    #[default]
    Digital = 0, // Digital input
    DigitalPwm = 1,  // Digital input, PWM output
    Analogue = 2,    // Analogue input (threshold detection)
    AnaloguePwm = 3, // Analogue input, PWM output
    CanDigital = 4,  // CAN bus controlled digital output
    CanPwm = 5,      // CAN bus controlled PWM output
}

impl TryFrom<u8> for ChannelType {
    type Error = PdmError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ChannelType::Digital),
            1 => Ok(ChannelType::DigitalPwm),
            2 => Ok(ChannelType::Analogue),
            3 => Ok(ChannelType::AnaloguePwm),
            4 => Ok(ChannelType::CanDigital),
            5 => Ok(ChannelType::CanPwm),
            other => Err(PdmError::Schema(format!("unknown channel type {other}"))),
        }
    }
}

impl ChannelType {
    pub fn is_pwm(self) -> bool {
        matches!(
            self,
            ChannelType::DigitalPwm | ChannelType::AnaloguePwm | ChannelType::CanPwm
        )
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct ChannelErrorFlags: u8 {
        const OVERCURRENT = 0x01;
        const UNDERCURRENT = 0x02;
        const IS_FAULT = 0x04;
        const RETRY_LOCKOUT = 0x08;
    }
}

impl Default for ChannelErrorFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// One output channel as reported by, or configured on, the device
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Channel {
    pub channel_type: ChannelType,
    pub pwm_duty: u8,
    pub enabled: bool,
    pub name: [u8; CHANNEL_NAME_LENGTH],
    pub analog_raw: i32, // Used for calibration
    pub current_value: f32,
    pub override_active: bool,
    pub current_limit_high: f32,
    pub current_threshold_high: f32, // Turn off threshold
    pub current_threshold_low: f32,  // Open circuit detection
    pub retry_count: u8,
    pub inrush_delay_ms: i32,
    pub multi_channel: u8,
    pub group_number: u8,
    pub control_pin: u8,
    pub current_sense_pin: u8,
    pub input_control_pin: u8,
    pub run_on: bool,
    pub run_on_time_ms: i32,
    pub error_flags: ChannelErrorFlags,
}

impl Channel {
    /// Name with trailing NUL padding removed
    pub fn name_str(&self) -> String {
        let end = self
            .name
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// Stores the first three bytes of `name`, NUL-padded
    pub fn set_name(&mut self, name: &str) {
        self.name = [0; CHANNEL_NAME_LENGTH];
        for (slot, byte) in self.name.iter_mut().zip(name.bytes()) {
            *slot = byte;
        }
    }

    pub fn has_any_error(&self) -> bool {
        !self.error_flags.is_empty()
    }

    pub fn has_overcurrent(&self) -> bool {
        self.error_flags.contains(ChannelErrorFlags::OVERCURRENT)
    }

    pub fn has_undercurrent(&self) -> bool {
        self.error_flags.contains(ChannelErrorFlags::UNDERCURRENT)
    }

    pub fn has_is_fault(&self) -> bool {
        self.error_flags.contains(ChannelErrorFlags::IS_FAULT)
    }

    pub fn has_retry_lockout(&self) -> bool {
        self.error_flags.contains(ChannelErrorFlags::RETRY_LOCKOUT)
    }
}
