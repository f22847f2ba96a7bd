use crate::error::{PdmError, Result};
use crate::types::{NUM_ANALOGUE_INPUTS, NUM_DIGITAL_INPUTS, NUM_OUTPUT_CHANNELS};
use std::cmp::Ordering;
use std::fmt;

pub const CHANNEL_FIELDS: [&str; 13] = [
    "type",
    "current_limit_high",
    "current_threshold_high",
    "current_threshold_low",
    "enabled",
    "group_number",
    "input_control_pin",
    "multi_channel",
    "retry_count",
    "inrush_delay_ms",
    "name",
    "run_on",
    "run_on_time_ms",
];

pub const ANALOGUE_FIELDS: [&str; 10] = [
    "pull_up_enable",
    "pull_down_enable",
    "is_digital",
    "is_threshold",
    "on_threshold",
    "off_threshold",
    "input_scale_low",
    "input_scale_high",
    "pwm_low_value",
    "pwm_high_value",
];

pub const SYSTEM_FIELDS: [&str; 9] = [
    "can_termination",
    "system_current_limit",
    "channel_data_can_id",
    "system_data_can_id",
    "config_data_can_id",
    "imu_wake_window_ms",
    "unit_preferences",
    "allow_data",
    "allow_gps",
];

pub const DIGITAL_FIELDS: [&str; 1] = ["active_high"];

/// Configuration category; the discriminant is the domain byte on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Domain {
    Channel = 0,
    AnalogueInput = 1,
    SystemParameter = 2,
    DigitalInput = 3,
}

impl Domain {
    /// Order in which a push cycle walks the domains
    pub const ORDER: [Domain; 4] = [
        Domain::Channel,
        Domain::AnalogueInput,
        Domain::SystemParameter,
        Domain::DigitalInput,
    ];

    pub fn field_names(self) -> &'static [&'static str] {
        match self {
            Domain::Channel => &CHANNEL_FIELDS,
            Domain::AnalogueInput => &ANALOGUE_FIELDS,
            Domain::SystemParameter => &SYSTEM_FIELDS,
            Domain::DigitalInput => &DIGITAL_FIELDS,
        }
    }

    pub fn parameter_count(self) -> u8 {
        self.field_names().len() as u8
    }

    pub fn item_count(self) -> u8 {
        match self {
            Domain::Channel => NUM_OUTPUT_CHANNELS as u8,
            Domain::AnalogueInput => NUM_ANALOGUE_INPUTS as u8,
            Domain::SystemParameter => 1,
            Domain::DigitalInput => NUM_DIGITAL_INPUTS as u8,
        }
    }

    /// System parameters are a single record, so no item byte is sent
    pub fn has_item_byte(self) -> bool {
        self != Domain::SystemParameter
    }

    pub fn next(self) -> Option<Domain> {
        match self {
            Domain::Channel => Some(Domain::AnalogueInput),
            Domain::AnalogueInput => Some(Domain::SystemParameter),
            Domain::SystemParameter => Some(Domain::DigitalInput),
            Domain::DigitalInput => None,
        }
    }
}

impl TryFrom<u8> for Domain {
    type Error = PdmError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Domain::Channel),
            1 => Ok(Domain::AnalogueInput),
            2 => Ok(Domain::SystemParameter),
            3 => Ok(Domain::DigitalInput),
            other => Err(PdmError::InvalidParameter(format!("unknown domain {other}"))),
        }
    }
}

/// One configurable field: (domain, parameter index, item index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub domain: Domain,
    pub parameter: u8,
    pub item: u8,
}

impl Address {
    pub const FIRST: Address = Address {
        domain: Domain::Channel,
        parameter: 0,
        item: 0,
    };

    pub fn new(domain: Domain, parameter: u8, item: u8) -> Result<Self> {
        if parameter >= domain.parameter_count() {
            return Err(PdmError::InvalidParameter(format!(
                "parameter {parameter} out of range for {domain:?}"
            )));
        }
        if item >= domain.item_count() {
            return Err(PdmError::InvalidParameter(format!(
                "item {item} out of range for {domain:?}"
            )));
        }
        Ok(Self {
            domain,
            parameter,
            item,
        })
    }

    /// Parameter first, then item, then domain
    pub fn next(self) -> Option<Address> {
        if self.parameter + 1 < self.domain.parameter_count() {
            return Some(Address {
                parameter: self.parameter + 1,
                ..self
            });
        }
        if self.item + 1 < self.domain.item_count() {
            return Some(Address {
                parameter: 0,
                item: self.item + 1,
                ..self
            });
        }
        self.domain.next().map(|domain| Address {
            domain,
            parameter: 0,
            item: 0,
        })
    }

    /// Every configurable address, in push order
    pub fn all() -> impl Iterator<Item = Address> {
        std::iter::successors(Some(Address::FIRST), |address| address.next())
    }

    pub fn field_name(&self) -> &'static str {
        self.domain.field_names()[self.parameter as usize]
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.domain, self.item, self.parameter).cmp(&(other.domain, other.item, other.parameter))
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:?}, {}, {}) {}",
            self.domain,
            self.parameter,
            self.item,
            self.field_name()
        )
    }
}

/// Total number of addresses in one push cycle
pub fn total_field_count() -> usize {
    Domain::ORDER
        .iter()
        .map(|d| d.parameter_count() as usize * d.item_count() as usize)
        .sum()
}
