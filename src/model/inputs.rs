#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Analogue input configuration
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnalogueInput {
    pub pull_up_enable: bool,
    pub pull_down_enable: bool,
    pub is_digital: bool,
    /// Threshold switching when set, scaled PWM output otherwise (analogue mode only)
    pub is_threshold: bool,
    pub on_threshold: f32,
    pub off_threshold: f32,
    pub input_scale_low: f32,
    pub input_scale_high: f32,
    pub pwm_low_value: u8,
    pub pwm_high_value: u8,
}

impl AnalogueInput {
    pub fn is_scaled(&self) -> bool {
        !self.is_digital && !self.is_threshold
    }
}

/// Digital input configuration
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DigitalInput {
    pub active_high: bool,
}
