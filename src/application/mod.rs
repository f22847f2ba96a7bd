//! Application layer: the PDM configuration protocol.
//!
//! - [`decoder`]: validation and decoding of inbound frames
//! - [`diff`]: field-by-field comparison of live and desired snapshots
//! - [`session`]: the single-outstanding-command state machine
//! - [`engine`]: the threaded client driving a [`PhysicalLayer`](crate::physical::PhysicalLayer)
//! - [`events`]: notifications to consumers
//!
//! A session always starts with a handshake (BEGIN answered by CONFIRM),
//! after which the host polls with REQUEST. A configuration push walks every
//! configurable field in a fixed order, sending NEWCONFIG with an update
//! frame for fields that differ and SKIP for those that match, then commits
//! with SAVECHANGES. Every step waits for the device's CONFIRM.
//!
//! # Examples
//!
//! ```rust,no_run
//! # #[cfg(feature = "serial")]
//! # fn main() -> pdmlink::error::Result<()> {
//! use pdmlink::application::{EngineConfig, PdmClient};
//! use pdmlink::physical::serial::{SerialConfig, SerialPhysical};
//!
//! let serial = SerialConfig {
//!     port_name: "/dev/ttyACM0".into(),
//!     ..Default::default()
//! };
//! let mut client: PdmClient<SerialPhysical> = PdmClient::new(EngineConfig::default(), serial)?;
//! client.on_snapshot_updated(|snapshot| {
//!     println!("battery {:.1} V", snapshot.system.battery_voltage);
//! });
//! client.open()?;
//!
//! let mut desired = (*client.live_snapshot()).clone();
//! desired.channels[0].enabled = true;
//! client.request_config_push(desired)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```

pub mod decoder;
pub mod diff;
pub mod engine;
pub mod events;
pub mod session;

pub use decoder::{decode, encode_telemetry, Decoded};
pub use diff::{decode_update, encode_override, encode_update, next_step, ConfigDiff, Cursor, Step};
pub use engine::{EngineConfig, PdmClient};
pub use events::{Event, Notifier};
pub use session::{Action, Awaiting, Outbound, ProtocolMachine, ProtocolState, SessionFlags};
