//! Device data model.
//!
//! A [`Snapshot`] holds every record the device reports: 14 output channels,
//! 8 analogue inputs, 8 digital inputs and one set of system parameters.
//! Configurable fields are addressed by [`Address`] and read or written
//! through the per-domain field tables in [`fields`].

pub mod address;
pub mod channel;
pub mod fields;
pub mod inputs;
pub mod snapshot;
pub mod system;

pub use address::{total_field_count, Address, Domain};
pub use channel::{Channel, ChannelErrorFlags, ChannelType};
pub use fields::{FieldValue, Slot};
pub use inputs::{AnalogueInput, DigitalInput};
pub use snapshot::Snapshot;
pub use system::{DistanceUnit, SpeedUnit, SystemParameters};
