//! # Sensor Frame Module
//!
//! Binary reading format of the Emporia Vue sensor co-processor.
//!
//! This module handles:
//! - Frame layout constants and the decoded [`SensorReading`](protocol::SensorReading)
//! - CRC-8 checksum calculation
//! - Frame validation (end marker, unread flag, checksum)
//! - Frame encoding for replay captures and fixtures

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;
