//! # Emporia Vue Bridge
//!
//! Polls an Emporia Vue sensor and publishes calibrated voltage, power and
//! current values to the log and, optionally, to JSONL telemetry files.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use emporia_vue::config::{Config, TransportKind};
use emporia_vue::telemetry::TelemetryLogger;
use emporia_vue::transport::{ReplayTransport, SensorTransport, SerialTransport};
use emporia_vue::update::{PollOutcome, UpdateCycle};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Parser, Debug)]
#[command(name = "emporia-vue", version, about = "Emporia Vue sensor bridge")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "EMPORIA_VUE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Read frames from a capture file instead of the configured sensor.
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Perform a single poll and exit.
    #[arg(long)]
    once: bool,
}

/// Main entry point
///
/// 1. Parse the command line and load the configuration
/// 2. Set up logging, open the frame source and build the channels
/// 3. Poll every `poll_interval_ms` until Ctrl+C, or until a replay file
///    runs out
///
/// # Errors
///
/// Returns error if the configuration is invalid or the frame source cannot
/// be opened. Failures of individual polls are logged and never stop the
/// loop.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    apply_overrides(&mut config, &cli);

    let _guard = init_tracing(&config.logging.file_dir)?;

    info!("Emporia Vue bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", cli.config.display());

    let transport = open_transport(&config)?;
    info!("Reading frames from {}", transport.describe());

    let telemetry = if config.telemetry.enabled {
        let logger = TelemetryLogger::from_config(&config.telemetry)
            .context("Failed to initialize telemetry logger")?;
        info!("Recording telemetry to {}", logger.log_dir().display());
        Some(Arc::new(Mutex::new(logger)))
    } else {
        None
    };

    let mut cycle = UpdateCycle::from_config(transport, &config, telemetry.as_ref())?;
    for line in cycle.describe().lines() {
        info!("{}", line);
    }

    if cli.once {
        let outcome = tokio::task::block_in_place(|| cycle.poll());
        info!("Poll finished: {:?}", outcome);
        return Ok(());
    }

    let mut poll_interval = interval(Duration::from_millis(config.sensor.poll_interval_ms));
    poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Polling sensor every {}ms", config.sensor.poll_interval_ms);
    info!("Press Ctrl+C to exit");

    let status_interval = config.logging.status_interval_readings;
    let mut last_status = 0u64;

    loop {
        tokio::select! {
            _ = poll_interval.tick() => {
                let outcome = tokio::task::block_in_place(|| cycle.poll());
                if outcome == PollOutcome::SourceExhausted {
                    info!("Frame source exhausted");
                    break;
                }

                let accepted = cycle.stats().accepted;
                if accepted - last_status >= status_interval {
                    info!("Sensor status: {}", cycle.stats());
                    last_status = accepted;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!("Shutdown complete. {}", cycle.stats());

    Ok(())
}

/// Applies command line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(path) = &cli.replay {
        config.sensor.transport = TransportKind::Replay;
        config.sensor.replay_file = path.display().to_string();
    }
}

/// Opens the configured frame source
fn open_transport(config: &Config) -> Result<Box<dyn SensorTransport>> {
    let sensor = &config.sensor;
    let transport: Box<dyn SensorTransport> = match sensor.transport {
        TransportKind::Serial => Box::new(SerialTransport::open(sensor)?),
        TransportKind::Replay => {
            Box::new(ReplayTransport::open(&sensor.replay_file, sensor.replay_loop)?)
        }
    };
    Ok(transport)
}

/// Logs to stdout, and to a daily rotated file when `file_dir` is set
fn init_tracing(file_dir: &str) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = if file_dir.is_empty() {
        (None, None)
    } else {
        let dir = Path::new(file_dir);
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(dir, "emporia-vue.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["emporia-vue"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(cli.replay.is_none());
        assert!(!cli.once);
    }

    #[test]
    fn test_replay_override() {
        let cli = Cli::try_parse_from(["emporia-vue", "--replay", "capture.bin", "--once"]).unwrap();
        let mut config = Config::default();

        apply_overrides(&mut config, &cli);

        assert_eq!(config.sensor.transport, TransportKind::Replay);
        assert_eq!(config.sensor.replay_file, "capture.bin");
        assert!(cli.once);
    }

    #[test]
    fn test_no_override_keeps_serial() {
        let cli = Cli::try_parse_from(["emporia-vue"]).unwrap();
        let mut config = Config::default();

        apply_overrides(&mut config, &cli);

        assert_eq!(config.sensor.transport, TransportKind::Serial);
    }

    #[test]
    fn test_default_config_file_is_valid() {
        let config = Config::load(DEFAULT_CONFIG_PATH).unwrap();
        assert_eq!(config.phases.len(), 3);
        assert!(!config.ct_clamps.is_empty());
    }
}
