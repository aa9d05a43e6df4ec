//! # CT Clamp Channel
//!
//! Power and current of one current-transformer clamp.
//!
//! ## Power
//!
//! The sensor correlates every clamp against all three voltage wires; the
//! value matching the wire of the clamp's phase is used:
//!
//! `power = raw_power[port][phase.input_wire] * phase.calibration / correction_factor`
//!
//! | Ports | Clamp | `correction_factor` |
//! |-------|-------|--------------------:|
//! | A, B, C (0-2) | mains | 5.5 |
//! | 1-16 (3-18) | branch circuit | 22 |
//!
//! ## Current
//!
//! The device's current scaling is undocumented, so the raw value is
//! published unmodified.

use std::fmt;
use tracing::error;

use super::phase::PhaseChannel;
use super::PhaseId;
use crate::frame::protocol::{CtPort, SensorReading};
use crate::telemetry::Sink;

/// Raw power reported when the clamp's port is not part of the frame
pub const INVALID_RAW_POWER: i32 = -1;

/// One configured CT clamp
pub struct ClampChannel {
    name: String,
    phase: PhaseId,
    input_port: CtPort,
    power_sink: Option<Box<dyn Sink>>,
    current_sink: Option<Box<dyn Sink>>,
}

impl fmt::Debug for ClampChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClampChannel")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("input_port", &self.input_port)
            .field("power_sink", &self.power_sink.is_some())
            .field("current_sink", &self.current_sink.is_some())
            .finish()
    }
}

impl ClampChannel {
    /// Creates a clamp on `input_port`, measured against `phase`.
    #[must_use]
    pub fn new(name: impl Into<String>, phase: PhaseId, input_port: CtPort) -> Self {
        Self {
            name: name.into(),
            phase,
            input_port,
            power_sink: None,
            current_sink: None,
        }
    }

    /// Attaches the calibrated power output.
    #[must_use]
    pub fn with_power_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.power_sink = Some(sink);
        self
    }

    /// Attaches the raw current output.
    #[must_use]
    pub fn with_current_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.current_sink = Some(sink);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> PhaseId {
        self.phase
    }

    pub fn input_port(&self) -> CtPort {
        self.input_port
    }

    pub fn has_power_sink(&self) -> bool {
        self.power_sink.is_some()
    }

    pub fn has_current_sink(&self) -> bool {
        self.current_sink.is_some()
    }

    /// Raw power of this clamp correlated against `phase`'s wire.
    ///
    /// Returns [`INVALID_RAW_POWER`] if the port is outside the frame.
    #[must_use]
    pub fn raw_power(&self, reading: &SensorReading, phase: &PhaseChannel) -> i32 {
        match reading.power.get(self.input_port.index()) {
            Some(entry) => entry.for_wire(phase.input_wire()),
            None => {
                error!(
                    "CT port index {} of '{}' is outside the reading, this should never happen",
                    self.input_port.index(),
                    self.name
                );
                INVALID_RAW_POWER
            }
        }
    }

    /// Converts raw power to watts using the phase calibration and this
    /// port's clamp model.
    ///
    /// # Examples
    ///
    /// ```
    /// use emporia_vue::channel::clamp::ClampChannel;
    /// use emporia_vue::channel::phase::PhaseChannel;
    /// use emporia_vue::channel::PhaseId;
    /// use emporia_vue::frame::protocol::{CtPort, WireColor};
    ///
    /// let phase = PhaseChannel::new("phase_a", WireColor::Black, 1.02);
    /// let clamp = ClampChannel::new("main_a", PhaseId::new(0), CtPort::new(1));
    /// assert!((clamp.calibrated_power(1000, &phase) - 185.45).abs() < 0.01);
    /// ```
    #[must_use]
    pub fn calibrated_power(&self, raw_power: i32, phase: &PhaseChannel) -> f32 {
        (raw_power as f32 * phase.calibration()) / self.input_port.correction_factor()
    }

    /// Raw current of this clamp, `None` if the port is outside the frame.
    #[must_use]
    pub fn raw_current(&self, reading: &SensorReading) -> Option<u16> {
        reading.current.get(self.input_port.index()).copied()
    }

    /// Publishes power and current to whichever outputs are attached.
    ///
    /// `phases` is the phase collection `self.phase` indexes into.
    pub fn update_from_reading(&mut self, reading: &SensorReading, phases: &[PhaseChannel]) {
        if self.power_sink.is_some() {
            match phases.get(self.phase.index()) {
                Some(phase) => {
                    let power = self.calibrated_power(self.raw_power(reading, phase), phase);
                    if let Some(sink) = self.power_sink.as_mut() {
                        sink.publish(power);
                    }
                }
                None => error!(
                    "Phase {} of '{}' does not exist, this should never happen",
                    self.phase.index(),
                    self.name
                ),
            }
        }

        if self.current_sink.is_some() {
            match self.raw_current(reading) {
                Some(raw_current) => {
                    if let Some(sink) = self.current_sink.as_mut() {
                        sink.publish(f32::from(raw_current));
                    }
                }
                None => error!(
                    "CT port index {} of '{}' is outside the reading, this should never happen",
                    self.input_port.index(),
                    self.name
                ),
            }
        }
    }
}
