//! CLI-specific error types and mappings.
//!
//! Maps controller and port failures to exit codes and user-facing
//! messages.

use parley_core::PortError;
use parley_voice::TurnError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Microphone or speaker could not be used.
    #[error("Audio device error: {0}")]
    Device(String),

    /// Any other controller failure.
    #[error("{0}")]
    Turn(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Turn(_) => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::Device(_) => 69,   // EX_UNAVAILABLE
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<PortError> for CliError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Channel(msg) => Self::Turn(format!("Agent channel: {msg}")),
            other => Self::Device(other.to_string()),
        }
    }
}

impl From<TurnError> for CliError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::InvalidConfig(msg) => Self::Config(msg),
            TurnError::Port(port) => port.into(),
            TurnError::NotReady => Self::Device(err.to_string()),
            TurnError::NotCapturing | TurnError::ControllerStopped => Self::Turn(err.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
