#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum SpeedUnit {
    #[default]
    Mph = 0,
    Kmh = 1,
}

impl From<u8> for SpeedUnit {
    fn from(value: u8) -> Self {
        if value == 0 {
            SpeedUnit::Mph
        } else {
            SpeedUnit::Kmh
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum DistanceUnit {
    #[default]
    Metres = 0,
    Feet = 1,
}

impl From<u8> for DistanceUnit {
    fn from(value: u8) -> Self {
        if value == 0 {
            DistanceUnit::Metres
        } else {
            DistanceUnit::Feet
        }
    }
}

/// Largest identifier representable in a standard (11-bit) CAN frame
pub const MAX_STANDARD_CAN_ID: u16 = 0x7FF;

/// Device-wide status and settings
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystemParameters {
    pub temperature: i32,
    pub can_termination: bool,
    pub battery_voltage: f32,
    pub system_current: f32,
    pub system_current_limit: f32,
    pub error_flags: u8,
    pub channel_data_can_id: u16, // transmit
    pub system_data_can_id: u16,  // transmit
    pub config_data_can_id: u16,  // receive
    pub imu_wake_window_ms: u32,
    pub speed_unit: SpeedUnit,
    pub distance_unit: DistanceUnit,
    pub allow_data: bool,
    pub allow_gps: bool,
    pub battery_soc: i32,
    pub battery_soh: i32,
}

impl SystemParameters {
    pub fn has_any_error(&self) -> bool {
        self.error_flags != 0
    }

    pub fn can_ids(&self) -> [u16; 3] {
        [
            self.channel_data_can_id,
            self.system_data_can_id,
            self.config_data_can_id,
        ]
    }
}
