//! Turn-taking error types.

use parley_core::PortError;

/// Errors returned by the turn-taking controller.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TurnError {
    /// Capture, playback or the agent channel is not ready.
    #[error("Voice controller is not ready: audio devices or agent channel unavailable")]
    NotReady,

    /// Stop-and-send was requested with no active turn session.
    #[error("No active recording")]
    NotCapturing,

    /// An external primitive rejected a call.
    #[error(transparent)]
    Port(#[from] PortError),

    /// The controller task has shut down.
    #[error("Voice controller stopped")]
    ControllerStopped,

    /// The configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
