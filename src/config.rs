//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Phases and CT clamps are declared the same way as in the ESPHome
//! `emporia_vue` component: each phase names its input wire and calibration,
//! each clamp names its phase and its port on the device.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::channel::PhaseId;
use crate::error::{Result, VueError};
use crate::frame::protocol::{CtPort, WireColor, NUM_CT_PORTS, NUM_WIRES};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub sensor: SensorConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub phases: Vec<PhaseConfig>,

    #[serde(default)]
    pub ct_clamps: Vec<ClampConfig>,
}

/// Where frames are read from
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Serial,
    Replay,
}

/// Sensor connection and polling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    #[serde(default)]
    pub transport: TransportKind,

    #[serde(default = "default_sensor_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub replay_file: String,

    #[serde(default)]
    pub replay_loop: bool,
}

/// Telemetry recording configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

/// Diagnostic log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Directory for a daily rolling log file; empty logs to stdout only
    #[serde(default)]
    pub file_dir: String,

    /// Number of accepted readings between status summaries
    #[serde(default = "default_status_interval_readings")]
    pub status_interval_readings: u64,
}

/// One phase (voltage input)
#[derive(Debug, Deserialize, Clone)]
pub struct PhaseConfig {
    pub id: String,

    pub input: WireColor,

    pub calibration: f32,

    /// Name of the calibrated voltage output, if published
    #[serde(default)]
    pub voltage: Option<String>,
}

/// One CT clamp
#[derive(Debug, Deserialize, Clone)]
pub struct ClampConfig {
    pub phase_id: String,

    pub input: CtPort,

    #[serde(default)]
    pub name: Option<String>,

    /// Name of the calibrated power output, if published
    #[serde(default)]
    pub power: Option<String>,

    /// Name of the raw current output, if published
    #[serde(default)]
    pub current: Option<String>,
}

impl ClampConfig {
    /// Display name of the clamp, defaulting to its port label.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("ct_{}", self.input))
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            port: default_sensor_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            replay_file: String::new(),
            replay_loop: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_dir: String::new(),
            status_interval_readings: default_status_interval_readings(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

// Default value functions
fn default_sensor_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 100 }
fn default_poll_interval_ms() -> u64 { 240 }

fn default_log_dir() -> String { "./telemetry".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

fn default_status_interval_readings() -> u64 { 250 }

fn invalid(message: impl Into<String>) -> VueError {
    VueError::ConfigValue(message.into())
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use emporia_vue::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Index of the phase with the given id
    pub fn resolve_phase(&self, phase_id: &str) -> Option<PhaseId> {
        self.phases
            .iter()
            .position(|phase| phase.id == phase_id)
            .map(PhaseId::new)
    }

    /// Settings that are accepted but almost certainly a wiring mistake
    ///
    /// Kept apart from [`Config::validate`] so the caller can report them once
    /// logging is set up.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut wires = HashSet::new();

        for phase in &self.phases {
            if !wires.insert(phase.input) {
                warnings.push(format!(
                    "Phase '{}' uses wire {} which is already assigned to another phase",
                    phase.id, phase.input
                ));
            }
        }

        warnings
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        self.validate_sensor()?;
        self.validate_telemetry()?;
        self.validate_channels()
    }

    fn validate_sensor(&self) -> Result<()> {
        let sensor = &self.sensor;

        match sensor.transport {
            TransportKind::Serial => {
                if sensor.port.is_empty() {
                    return Err(invalid("sensor port cannot be empty"));
                }
                if sensor.baud_rate == 0 {
                    return Err(invalid("baud_rate must be greater than 0"));
                }
            }
            TransportKind::Replay => {
                if sensor.replay_file.is_empty() {
                    return Err(invalid("replay_file cannot be empty when transport is 'replay'"));
                }
            }
        }

        if sensor.timeout_ms == 0 || sensor.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if sensor.poll_interval_ms == 0 || sensor.poll_interval_ms > 60000 {
            return Err(invalid("poll_interval_ms must be between 1 and 60000"));
        }

        if self.logging.status_interval_readings == 0 {
            return Err(invalid("status_interval_readings must be greater than 0"));
        }

        Ok(())
    }

    fn validate_telemetry(&self) -> Result<()> {
        let telemetry = &self.telemetry;

        if telemetry.enabled && telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }

    fn validate_channels(&self) -> Result<()> {
        if self.phases.len() > NUM_WIRES {
            return Err(invalid(format!(
                "at most {} phases can be configured, got {}",
                NUM_WIRES,
                self.phases.len()
            )));
        }

        if self.ct_clamps.len() > NUM_CT_PORTS {
            return Err(invalid(format!(
                "at most {} CT clamps can be configured, got {}",
                NUM_CT_PORTS,
                self.ct_clamps.len()
            )));
        }

        let mut ids = HashSet::new();
        for phase in &self.phases {
            if phase.id.is_empty() {
                return Err(invalid("phase id cannot be empty"));
            }
            if !ids.insert(phase.id.as_str()) {
                return Err(invalid(format!("duplicate phase id '{}'", phase.id)));
            }
            if !phase.calibration.is_finite() || phase.calibration == 0.0 {
                return Err(invalid(format!(
                    "calibration of phase '{}' must be a finite, non-zero number",
                    phase.id
                )));
            }
            check_output_name(&phase.voltage)?;
        }

        for clamp in &self.ct_clamps {
            if self.resolve_phase(&clamp.phase_id).is_none() {
                return Err(invalid(format!(
                    "CT clamp '{}' references unknown phase '{}'",
                    clamp.display_name(),
                    clamp.phase_id
                )));
            }
            if !clamp.input.is_valid() {
                return Err(invalid(format!(
                    "CT clamp '{}' port index {} is out of bounds (must be 0-{})",
                    clamp.display_name(),
                    clamp.input.index(),
                    NUM_CT_PORTS - 1
                )));
            }
            check_output_name(&clamp.power)?;
            check_output_name(&clamp.current)?;
        }

        Ok(())
    }
}

fn check_output_name(name: &Option<String>) -> Result<()> {
    match name {
        Some(name) if name.trim().is_empty() => Err(invalid("output names cannot be empty")),
        _ => Ok(()),
    }
}
