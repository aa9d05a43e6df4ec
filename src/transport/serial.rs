//! # Serial Transport
//!
//! Reads frames relayed by a serial bridge (e.g. a microcontroller polling
//! the sensor over I2C and forwarding each raw frame over UART/USB).
//!
//! Reads block until a whole frame arrived or the configured timeout expired.
//! After a failed read the input buffer is cleared so the next poll starts
//! on a frame boundary.

use std::fmt;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::SensorTransport;
use crate::config::SensorConfig;
use crate::error::{Result, VueError};

/// Frame source on a serial port
pub struct SerialTransport {
    port: Box<dyn tokio_serial::SerialPort>,
    device_path: String,
}

impl fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialTransport")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SerialTransport {
    /// Opens the serial port configured in the `[sensor]` section.
    pub fn open(config: &SensorConfig) -> Result<Self> {
        Self::open_port(&config.port, config.baud_rate, config.timeout_ms)
    }

    /// Opens a serial port with 8N1 framing.
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Line speed
    /// * `timeout_ms` - Read timeout for a whole frame
    ///
    /// # Errors
    ///
    /// Returns [`VueError::Transport`] if the port cannot be opened
    pub fn open_port(path: &str, baud_rate: u32, timeout_ms: u64) -> Result<Self> {
        debug!("Trying to open serial port: {}", path);

        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(Duration::from_millis(timeout_ms))
            .open()
            .map_err(|e| VueError::Transport(format!("Failed to open {}: {}", path, e)))?;

        info!("Opened sensor bridge at {} ({} baud)", path, baud_rate);
        Ok(Self {
            port,
            device_path: path.to_string(),
        })
    }

    /// Path of the opened serial device.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl SensorTransport for SerialTransport {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if let Err(e) = self.port.read_exact(buf) {
            if let Err(clear_err) = self.port.clear(tokio_serial::ClearBuffer::Input) {
                warn!("Failed to clear serial input buffer: {}", clear_err);
            }
            return Err(VueError::Transport(format!(
                "Failed to read frame from {}: {}",
                self.device_path, e
            )));
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("serial:{}", self.device_path)
    }
}
