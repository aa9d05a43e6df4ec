//! # I2C Transport
//!
//! Reads frames straight from the sensor co-processor over I2C.
//!
//! Works with any bus implementing the `embedded-hal` 1.0 [`I2c`] trait,
//! e.g. `linux-embedded-hal`'s `I2cdev` on a Raspberry Pi wired to the Vue's
//! debug header.

use embedded_hal::i2c::{Error as _, I2c};
use tracing::trace;

use super::SensorTransport;
use crate::error::{Result, VueError};

/// Default I2C address of the sensor co-processor
pub const DEFAULT_I2C_ADDRESS: u8 = 0x64;

/// Frame source on an I2C bus
#[derive(Debug)]
pub struct I2cTransport<I> {
    bus: I,
    address: u8,
}

impl<I: I2c> I2cTransport<I> {
    /// Creates a transport for the sensor at [`DEFAULT_I2C_ADDRESS`].
    pub fn new(bus: I) -> Self {
        Self::with_address(bus, DEFAULT_I2C_ADDRESS)
    }

    /// Creates a transport for a sensor at a custom address.
    pub fn with_address(bus: I, address: u8) -> Self {
        Self { bus, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Releases the underlying bus.
    pub fn into_inner(self) -> I {
        self.bus
    }
}

impl<I: I2c + Send> SensorTransport for I2cTransport<I> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.bus.read(self.address, buf).map_err(|e| {
            VueError::Transport(format!(
                "I2C read from 0x{:02X} failed: {:?}",
                self.address,
                e.kind()
            ))
        })?;

        trace!("Read {} bytes from I2C 0x{:02X}", buf.len(), self.address);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("i2c@0x{:02X}", self.address)
    }
}
