//! # Channel Module
//!
//! Calibration of raw readings into physical quantities.
//!
//! This module handles:
//! - Phase voltage calibration
//! - CT clamp power calibration and raw current pass-through
//! - Rendering the configured channels for the startup log

pub mod clamp;
pub mod phase;

use std::fmt;

use clamp::ClampChannel;
use phase::PhaseChannel;

/// Index of a phase in the phase collection owned by the update cycle.
///
/// Clamps refer to their phase through this index rather than owning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhaseId(usize);

impl PhaseId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Renders the configured phases and clamps, one setting per line.
///
/// # Examples
///
/// ```
/// use emporia_vue::channel::describe_channels;
/// use emporia_vue::channel::phase::PhaseChannel;
/// use emporia_vue::frame::protocol::WireColor;
///
/// let phases = vec![PhaseChannel::new("phase_a", WireColor::Black, 0.022)];
/// let text = describe_channels(&phases, &[]);
/// assert!(text.contains("Wire: BLACK"));
/// ```
pub fn describe_channels(phases: &[PhaseChannel], clamps: &[ClampChannel]) -> String {
    ChannelSummary { phases, clamps }.to_string()
}

/// Read-only view of the configured channels for display
#[derive(Debug, Clone, Copy)]
pub struct ChannelSummary<'a> {
    pub phases: &'a [PhaseChannel],
    pub clamps: &'a [ClampChannel],
}

impl fmt::Display for ChannelSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Emporia Vue")?;

        for phase in self.phases {
            writeln!(f, "  Phase '{}'", phase.name())?;
            writeln!(f, "    Wire: {}", phase.input_wire())?;
            writeln!(f, "    Calibration: {:.6}", phase.calibration())?;
            writeln!(f, "    Voltage: {}", enabled(phase.has_voltage_sink()))?;
        }

        for clamp in self.clamps {
            writeln!(f, "  CT Clamp '{}'", clamp.name())?;
            match self.phases.get(clamp.phase().index()) {
                Some(phase) => {
                    writeln!(f, "    Phase: {}", phase.name())?;
                    writeln!(f, "    Phase Calibration: {:.6}", phase.calibration())?;
                }
                None => writeln!(f, "    Phase: <missing #{}>", clamp.phase().index())?,
            }
            writeln!(
                f,
                "    CT Port: {} (index {})",
                clamp.input_port(),
                clamp.input_port().index()
            )?;
            writeln!(f, "    Power: {}", enabled(clamp.has_power_sink()))?;
            writeln!(f, "    Current: {}", enabled(clamp.has_current_sink()))?;
        }

        Ok(())
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::protocol::{CtPort, WireColor};
    use crate::telemetry::mocks::RecordingSink;

    #[test]
    fn test_phase_id_index() {
        assert_eq!(PhaseId::new(2).index(), 2);
    }

    #[test]
    fn test_describe_channels() {
        let sink = RecordingSink::new();
        let phases = vec![
            PhaseChannel::new("phase_a", WireColor::Black, 0.022).with_voltage_sink(sink.boxed()),
            PhaseChannel::new("phase_b", WireColor::Red, 0.0221),
        ];
        let clamps = vec![
            ClampChannel::new("main_a", PhaseId::new(0), CtPort::new(0))
                .with_power_sink(sink.boxed()),
            ClampChannel::new("dryer", PhaseId::new(1), CtPort::new(7)),
        ];

        let text = describe_channels(&phases, &clamps);

        assert!(text.contains("Phase 'phase_a'"));
        assert!(text.contains("Wire: BLACK"));
        assert!(text.contains("Wire: RED"));
        assert!(text.contains("Calibration: 0.022000"));
        assert!(text.contains("Voltage: enabled"));
        assert!(text.contains("Voltage: disabled"));
        assert!(text.contains("CT Clamp 'main_a'"));
        assert!(text.contains("CT Port: A (index 0)"));
        assert!(text.contains("CT Port: 5 (index 7)"));
        assert!(text.contains("Phase: phase_b"));
        assert!(text.contains("Power: enabled"));
        assert!(text.contains("Current: disabled"));
    }

    #[test]
    fn test_summary_display_matches_description() {
        let phases = vec![PhaseChannel::new("phase_a", WireColor::Blue, 1.0)];
        let clamps = vec![ClampChannel::new("main_c", PhaseId::new(0), CtPort::new(2))];
        let summary = ChannelSummary {
            phases: &phases,
            clamps: &clamps,
        };

        let text = format!("{}", summary);

        assert_eq!(text, describe_channels(&phases, &clamps));
        assert!(text.starts_with("Emporia Vue\n"));
        assert!(text.contains("CT Port: C (index 2)"));
        assert_eq!(text.lines().count(), 11);
    }

    #[test]
    fn test_describe_missing_phase() {
        let clamps = vec![ClampChannel::new("orphan", PhaseId::new(4), CtPort::new(0))];
        let text = describe_channels(&[], &clamps);
        assert!(text.contains("<missing #4>"));
    }
}
