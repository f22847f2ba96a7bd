use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdmError {
    // Frame integrity errors
    #[error("Frame too short: {0} bytes")]
    FrameTooShort(usize),
    #[error("Checksum mismatch: computed {computed:#010x}, received {received:#010x}")]
    Checksum { computed: u32, received: u32 },
    #[error("Unexpected frame header {0:#06x}")]
    Header(u16),
    #[error("Schema error: {0}")]
    Schema(String),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serial")]
    #[error("Serialport error: {0}")]
    Serial(#[from] serialport::Error),

    // Protocol errors
    #[error("No acknowledgment within the expected window")]
    ProtocolTimeout,
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Component not initialized")]
    NotInitialized,
    #[error("Device disconnected")]
    Disconnected,
}

impl PdmError {
    /// Errors that only cost a single frame; the engine keeps running after them.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            PdmError::FrameTooShort(_)
                | PdmError::Checksum { .. }
                | PdmError::Header(_)
                | PdmError::Schema(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PdmError>;
