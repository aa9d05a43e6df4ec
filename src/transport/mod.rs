//! # Transport Module
//!
//! Sources of raw sensor frames.
//!
//! This module handles:
//! - The [`SensorTransport`] abstraction the update cycle reads through
//! - Reading frames from the sensor's I2C bus
//! - Reading frames from a serial bridge
//! - Replaying captured frames from a file

pub mod i2c;
pub mod replay;
pub mod serial;

use crate::error::Result;

pub use i2c::I2cTransport;
pub use replay::ReplayTransport;
pub use serial::SerialTransport;

/// Blocking source of fixed-size frames.
///
/// A read either fills the whole buffer or fails; there is no retry at this
/// level, a failed read just skips one poll.
#[cfg_attr(test, mockall::automock)]
pub trait SensorTransport: Send {
    /// Reads exactly `buf.len()` bytes.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Human readable name of the source, for logs.
    fn describe(&self) -> String;
}

impl<T: SensorTransport + ?Sized> SensorTransport for Box<T> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact(buf)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
