//! # Error Types
//!
//! Custom error types for the Emporia Vue bridge using `thiserror`.

use thiserror::Error;

/// Main error type for the Emporia Vue bridge
#[derive(Debug, Error)]
pub enum VueError {
    /// Sensor bus errors (I2C, serial bridge, replay source)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Replay source has no more frames
    #[error("Replay source exhausted")]
    ReplayExhausted,

    /// Configuration parse errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration values that parse but are out of range
    #[error("Invalid configuration: {0}")]
    ConfigValue(String),

    /// Telemetry record encoding errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the Emporia Vue bridge
pub type Result<T> = std::result::Result<T, VueError>;
