//! # Phase Channel
//!
//! Voltage calibration for one electrical phase.
//!
//! The sensor samples each wire through a resistor divider; the configured
//! calibration multiplier turns the raw sample into volts:
//!
//! `voltage = raw_voltage[input_wire] * calibration`
//!
//! The same multiplier also scales the power of every CT clamp referencing
//! this phase (see [`ClampChannel`](super::clamp::ClampChannel)).

use std::fmt;

use crate::frame::protocol::{SensorReading, WireColor};
use crate::telemetry::Sink;

/// One configured phase
pub struct PhaseChannel {
    name: String,
    input_wire: WireColor,
    calibration: f32,
    voltage_sink: Option<Box<dyn Sink>>,
}

impl fmt::Debug for PhaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseChannel")
            .field("name", &self.name)
            .field("input_wire", &self.input_wire)
            .field("calibration", &self.calibration)
            .field("voltage_sink", &self.voltage_sink.is_some())
            .finish()
    }
}

impl PhaseChannel {
    /// Creates a phase without a voltage output.
    ///
    /// # Examples
    ///
    /// ```
    /// use emporia_vue::channel::phase::PhaseChannel;
    /// use emporia_vue::frame::protocol::{SensorReading, WireColor};
    ///
    /// let phase = PhaseChannel::new("phase_a", WireColor::Black, 0.022);
    /// let reading = SensorReading { voltage: [5500, 0, 0], ..Default::default() };
    /// assert!((phase.calibrated_voltage(&reading) - 121.0).abs() < 0.01);
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, input_wire: WireColor, calibration: f32) -> Self {
        Self {
            name: name.into(),
            input_wire,
            calibration,
            voltage_sink: None,
        }
    }

    /// Attaches the calibrated voltage output.
    #[must_use]
    pub fn with_voltage_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.voltage_sink = Some(sink);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_wire(&self) -> WireColor {
        self.input_wire
    }

    pub fn calibration(&self) -> f32 {
        self.calibration
    }

    pub fn has_voltage_sink(&self) -> bool {
        self.voltage_sink.is_some()
    }

    /// Calibrated voltage of this phase's wire in a reading.
    #[must_use]
    pub fn calibrated_voltage(&self, reading: &SensorReading) -> f32 {
        f32::from(reading.voltage[self.input_wire.index()]) * self.calibration
    }

    /// Publishes the calibrated voltage, if a voltage output is attached.
    pub fn update_from_reading(&mut self, reading: &SensorReading) {
        if self.voltage_sink.is_none() {
            return;
        }

        let voltage = self.calibrated_voltage(reading);
        if let Some(sink) = self.voltage_sink.as_mut() {
            sink.publish(voltage);
        }
    }
}
