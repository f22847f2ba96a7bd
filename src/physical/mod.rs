//! Physical layer: the ordered byte channel to the device.
//!
//! The protocol engine only needs raw byte I/O plus one piece of flow
//! information, how many bytes are immediately available, which the frame
//! assembler uses to detect the quiet gap that ends a frame.
//!
//! Implementations:
//! - [`serial`] (feature `serial`): a `serialport`-backed UART link
//! - [`mock`] (tests and feature `mock`): an in-memory device emulator
//!
//! # Examples
//!
//! ```rust,no_run
//! # #[cfg(feature = "serial")]
//! # fn main() -> pdmlink::error::Result<()> {
//! use pdmlink::physical::serial::{SerialConfig, SerialPhysical};
//! use pdmlink::physical::PhysicalLayer;
//!
//! let config = SerialConfig {
//!     port_name: "/dev/ttyACM0".into(),
//!     ..Default::default()
//! };
//! let mut link = SerialPhysical::new(config)?;
//! link.open()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```

#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(feature = "serial")]
pub mod serial;

use crate::error::Result;
use crate::types::Config;

/// Physical layer trait that must be implemented by every byte transport
pub trait PhysicalLayer: Send {
    type Config: Config;

    fn new(config: Self::Config) -> Result<Self>
    where
        Self: Sized;
    fn open(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;
    /// Returns `Ok(0)` when the read timeout elapses without data
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize>;
    /// Bytes received by the transport but not yet read
    fn bytes_pending(&mut self) -> Result<usize>;
    fn set_timeout(&mut self, timeout_ms: u32) -> Result<()>;
    /// A second handle on the same open channel, so reading and writing can
    /// happen on different threads
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;
}
