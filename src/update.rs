//! # Update Cycle
//!
//! One poll of the sensor: read a frame, validate it, check continuity and
//! hand the reading to every configured channel.
//!
//! A poll either distributes a validated reading to all channels or has no
//! effect at all besides logging; no channel ever sees a frame another one
//! did not.
//!
//! ## Usage
//!
//! ```
//! use emporia_vue::channel::phase::PhaseChannel;
//! use emporia_vue::frame::encoder::encode_reading;
//! use emporia_vue::frame::protocol::{SensorReading, WireColor};
//! use emporia_vue::transport::SensorTransport;
//! use emporia_vue::update::{PollOutcome, UpdateCycle};
//!
//! struct OneFrame([u8; 284]);
//!
//! impl SensorTransport for OneFrame {
//!     fn read_exact(&mut self, buf: &mut [u8]) -> emporia_vue::error::Result<()> {
//!         buf.copy_from_slice(&self.0);
//!         Ok(())
//!     }
//!
//!     fn describe(&self) -> String {
//!         "one-frame".to_string()
//!     }
//! }
//!
//! let frame = encode_reading(&SensorReading { is_unread: true, sequence_num: 7, ..Default::default() });
//! let phases = vec![PhaseChannel::new("phase_a", WireColor::Black, 0.022)];
//! let mut cycle = UpdateCycle::new(OneFrame(frame), phases, Vec::new());
//!
//! assert_eq!(cycle.poll(), PollOutcome::Accepted { sequence_num: 7, missed: None });
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{error, trace, warn};

use crate::channel::clamp::ClampChannel;
use crate::channel::describe_channels;
use crate::channel::phase::PhaseChannel;
use crate::config::Config;
use crate::error::{Result, VueError};
use crate::frame::decoder::{validate_frame, FrameRejection};
use crate::frame::protocol::{SensorReading, FRAME_SIZE};
use crate::sequence::SequenceTracker;
use crate::telemetry::{FanoutSink, LogSink, Sink, TelemetryLogger, TelemetrySink, Unit};
use crate::transport::SensorTransport;

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Reading was validated and distributed to all channels
    Accepted {
        sequence_num: u8,
        /// Readings missed since the previous accepted one
        missed: Option<u32>,
    },

    /// Frame was read but failed validation
    Rejected(FrameRejection),

    /// Frame could not be read
    TransportError(String),

    /// Frame source has no more data
    SourceExhausted,
}

impl PollOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PollOutcome::Accepted { .. })
    }
}

/// Running totals of poll outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub accepted: u64,
    pub stale: u64,
    pub checksum_mismatches: u64,
    pub malformed: u64,
    pub transport_errors: u64,
    pub missed_readings: u64,
}

impl PollStats {
    fn record(&mut self, outcome: &PollOutcome) {
        match outcome {
            PollOutcome::Accepted { missed, .. } => {
                self.accepted += 1;
                self.missed_readings += u64::from(missed.unwrap_or(0));
            }
            PollOutcome::Rejected(FrameRejection::Stale) => self.stale += 1,
            PollOutcome::Rejected(FrameRejection::ChecksumMismatch { .. }) => {
                self.checksum_mismatches += 1
            }
            PollOutcome::Rejected(FrameRejection::Malformed { .. }) => self.malformed += 1,
            PollOutcome::TransportError(_) => self.transport_errors += 1,
            PollOutcome::SourceExhausted => {}
        }
    }
}

impl fmt::Display for PollStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accepted={} missed={} stale={} bad_checksum={} malformed={} transport_errors={}",
            self.accepted,
            self.missed_readings,
            self.stale,
            self.checksum_mismatches,
            self.malformed,
            self.transport_errors
        )
    }
}

/// Polls a transport and distributes validated readings to the channels.
pub struct UpdateCycle<T> {
    transport: T,
    tracker: SequenceTracker,
    phases: Vec<PhaseChannel>,
    clamps: Vec<ClampChannel>,
    stats: PollStats,
}

impl<T: SensorTransport> UpdateCycle<T> {
    /// Creates a cycle over already built channels.
    ///
    /// Clamps index into `phases` through their [`PhaseId`](crate::channel::PhaseId).
    pub fn new(transport: T, phases: Vec<PhaseChannel>, clamps: Vec<ClampChannel>) -> Self {
        Self {
            transport,
            tracker: SequenceTracker::new(),
            phases,
            clamps,
            stats: PollStats::default(),
        }
    }

    /// Builds the channels declared in `config`.
    ///
    /// Every named output logs its values; when `telemetry` is given, it is
    /// also recorded there. Suspicious but accepted settings are logged at
    /// `warn` level.
    ///
    /// # Errors
    ///
    /// Returns error if a clamp references a phase that does not exist
    pub fn from_config(
        transport: T,
        config: &Config,
        telemetry: Option<&Arc<Mutex<TelemetryLogger>>>,
    ) -> Result<Self> {
        for warning in config.warnings() {
            warn!("{}", warning);
        }

        let phases = config
            .phases
            .iter()
            .map(|phase| {
                let channel = PhaseChannel::new(&phase.id, phase.input, phase.calibration);
                match &phase.voltage {
                    Some(name) => {
                        channel.with_voltage_sink(output_sink(name, Unit::Volts, telemetry))
                    }
                    None => channel,
                }
            })
            .collect();

        let mut clamps = Vec::with_capacity(config.ct_clamps.len());
        for clamp in &config.ct_clamps {
            let phase = config.resolve_phase(&clamp.phase_id).ok_or_else(|| {
                VueError::ConfigValue(format!(
                    "CT clamp '{}' references unknown phase '{}'",
                    clamp.display_name(),
                    clamp.phase_id
                ))
            })?;

            let mut channel = ClampChannel::new(clamp.display_name(), phase, clamp.input);
            if let Some(name) = &clamp.power {
                channel = channel.with_power_sink(output_sink(name, Unit::Watts, telemetry));
            }
            if let Some(name) = &clamp.current {
                channel = channel.with_current_sink(output_sink(name, Unit::Raw, telemetry));
            }
            clamps.push(channel);
        }

        Ok(Self::new(transport, phases, clamps))
    }

    /// Performs one poll.
    ///
    /// Never fails: every problem is logged and reported in the outcome, and
    /// the next poll starts from a clean slate.
    pub fn poll(&mut self) -> PollOutcome {
        let outcome = self.poll_once();
        self.stats.record(&outcome);
        outcome
    }

    fn poll_once(&mut self) -> PollOutcome {
        let mut frame = [0u8; FRAME_SIZE];

        match self.transport.read_exact(&mut frame) {
            Ok(()) => {}
            Err(VueError::ReplayExhausted) => return PollOutcome::SourceExhausted,
            Err(e) => {
                error!("Failed to read from sensor: {}", e);
                return PollOutcome::TransportError(e.to_string());
            }
        }

        let reading = match validate_frame(&frame) {
            Ok(reading) => reading,
            Err(rejection) => {
                if rejection.is_error() {
                    error!("Failed to read from sensor due to a {}", rejection);
                } else {
                    trace!("Ignoring sensor reading: {}", rejection);
                }
                return PollOutcome::Rejected(rejection);
            }
        };

        trace!("Received sensor reading with sequence #{}", reading.sequence_num);
        let missed = self.distribute(&reading);

        PollOutcome::Accepted {
            sequence_num: reading.sequence_num,
            missed,
        }
    }

    /// Records a validated reading's sequence number and publishes it to
    /// every phase, then every clamp, in configuration order.
    ///
    /// # Returns
    ///
    /// * `Option<u32>` - Readings missed before this one, if any
    pub fn distribute(&mut self, reading: &SensorReading) -> Option<u32> {
        let missed = self.tracker.observe(reading.sequence_num);

        for phase in self.phases.iter_mut() {
            phase.update_from_reading(reading);
        }
        for clamp in self.clamps.iter_mut() {
            clamp.update_from_reading(reading, &self.phases);
        }

        missed
    }

    pub fn tracker(&self) -> &SequenceTracker {
        &self.tracker
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    pub fn phases(&self) -> &[PhaseChannel] {
        &self.phases
    }

    pub fn clamps(&self) -> &[ClampChannel] {
        &self.clamps
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Renders the configured channels for the startup log.
    pub fn describe(&self) -> String {
        describe_channels(&self.phases, &self.clamps)
    }
}

/// Sink for one named output: always logged, recorded when telemetry is on.
fn output_sink(
    name: &str,
    unit: Unit,
    telemetry: Option<&Arc<Mutex<TelemetryLogger>>>,
) -> Box<dyn Sink> {
    let mut sink = FanoutSink::new().with(Box::new(LogSink::new(name, unit)));
    if let Some(logger) = telemetry {
        sink = sink.with(Box::new(TelemetrySink::new(name, Arc::clone(logger))));
    }
    Box::new(sink)
}
