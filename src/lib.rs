//! # Emporia Vue Library
//!
//! Read, validate and calibrate sensor frames from an Emporia Vue energy
//! monitor.
//!
//! The sensor reports one fixed-size frame per poll holding raw voltage,
//! power and current values for three phase wires and nineteen CT clamp
//! ports. This library validates those frames, tracks their sequence
//! numbers and turns them into calibrated voltage and power values published
//! to per-channel sinks.

pub mod channel;
pub mod config;
pub mod error;
pub mod frame;
pub mod sequence;
pub mod telemetry;
pub mod transport;
pub mod update;
