//! # Telemetry Module
//!
//! Output sinks receiving calibrated values from the channels.
//!
//! This module handles:
//! - The [`Sink`] trait every channel output publishes through
//! - Logging values via `tracing`
//! - Recording values to rotating JSONL files
//! - Fanning one value out to several sinks

pub mod logger;

use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub use logger::TelemetryLogger;

/// Destination for one channel output.
///
/// Publishing never fails from the caller's point of view; sinks deal with
/// their own errors.
pub trait Sink: Send {
    /// Publishes one value.
    fn publish(&mut self, value: f32);
}

/// Unit of a published quantity, used for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Volts,
    Watts,
    /// Uncalibrated device units
    Raw,
}

impl Unit {
    fn suffix(self) -> &'static str {
        match self {
            Unit::Volts => " V",
            Unit::Watts => " W",
            Unit::Raw => "",
        }
    }
}

/// Sink that logs each value at debug level.
#[derive(Debug, Clone)]
pub struct LogSink {
    name: String,
    unit: Unit,
}

impl LogSink {
    pub fn new(name: impl Into<String>, unit: Unit) -> Self {
        Self {
            name: name.into(),
            unit,
        }
    }
}

impl Sink for LogSink {
    fn publish(&mut self, value: f32) {
        debug!("'{}': {:.2}{}", self.name, value, self.unit.suffix());
    }
}

/// Sink that appends each value to a shared [`TelemetryLogger`].
#[derive(Debug, Clone)]
pub struct TelemetrySink {
    name: String,
    logger: Arc<Mutex<TelemetryLogger>>,
}

impl TelemetrySink {
    pub fn new(name: impl Into<String>, logger: Arc<Mutex<TelemetryLogger>>) -> Self {
        Self {
            name: name.into(),
            logger,
        }
    }
}

impl Sink for TelemetrySink {
    fn publish(&mut self, value: f32) {
        let Ok(mut logger) = self.logger.lock() else {
            warn!("Telemetry logger lock poisoned, dropping '{}'", self.name);
            return;
        };

        if let Err(e) = logger.record(&self.name, value) {
            warn!("Failed to record telemetry for '{}': {}", self.name, e);
        }
    }
}

/// Sink that forwards each value to several sinks in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn Sink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink, builder style.
    #[must_use]
    pub fn with(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Sink for FanoutSink {
    fn publish(&mut self, value: f32) {
        for sink in self.sinks.iter_mut() {
            sink.publish(value);
        }
    }
}
