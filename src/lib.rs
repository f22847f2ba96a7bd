// Protocol layers
pub mod application; // Decoder, config diff, state machine and client engine
pub mod data_link; // Frame envelope, checksum and receive assembly
pub mod model; // Device snapshot and field addressing
pub mod physical; // Serial and mock byte transports

// Re-exports for convenience
pub use application::{EngineConfig, Event, PdmClient, ProtocolState};
pub use model::{Address, Domain, Snapshot};
#[cfg(feature = "serial")]
pub use physical::serial::{available_ports, SerialConfig, SerialPhysical};

// Common types and traits
pub mod error;
pub mod types;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
