use super::PhysicalLayer;
use crate::error::{PdmError, Result};
use crate::types::Config;
use log::{debug, info};
use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

/// UART settings expected by the device
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub rts: bool,
    pub dtr: bool,
    pub timeout_ms: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            parity: Parity::Even,
            stop_bits: StopBits::Two,
            rts: true,
            dtr: true,
            timeout_ms: 20,
        }
    }
}

impl Config for SerialConfig {
    fn validate(&self) -> Result<()> {
        if self.port_name.is_empty() {
            return Err(PdmError::InvalidParameter("port name is empty".into()));
        }
        if self.baud_rate == 0 {
            return Err(PdmError::InvalidParameter("baud rate is zero".into()));
        }
        Ok(())
    }
}

/// Names of the serial ports present on this machine
pub fn available_ports() -> Result<Vec<String>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}

/// Serial port implementation
pub struct SerialPhysical {
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPhysical {
    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(PdmError::NotInitialized)
    }
}

impl PhysicalLayer for SerialPhysical {
    type Config = SerialConfig;

    fn new(config: Self::Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, port: None })
    }

    fn open(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }
        let mut port = serialport::new(&self.config.port_name, self.config.baud_rate)
            .data_bits(self.config.data_bits)
            .parity(self.config.parity)
            .stop_bits(self.config.stop_bits)
            .timeout(Duration::from_millis(self.config.timeout_ms as u64))
            .open()?;
        port.write_request_to_send(self.config.rts)?;
        port.write_data_terminal_ready(self.config.dtr)?;
        info!(
            "opened {} @ {} baud",
            self.config.port_name, self.config.baud_rate
        );
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("closed {}", self.config.port_name);
        }
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port()?.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn bytes_pending(&mut self) -> Result<usize> {
        Ok(self.port()?.bytes_to_read()? as usize)
    }

    fn set_timeout(&mut self, timeout_ms: u32) -> Result<()> {
        self.config.timeout_ms = timeout_ms;
        if let Some(port) = self.port.as_mut() {
            port.set_timeout(Duration::from_millis(timeout_ms as u64))?;
        }
        Ok(())
    }

    fn try_clone(&self) -> Result<Self> {
        let port = self.port.as_ref().ok_or(PdmError::NotInitialized)?;
        Ok(Self {
            config: self.config.clone(),
            port: Some(port.try_clone()?),
        })
    }
}
