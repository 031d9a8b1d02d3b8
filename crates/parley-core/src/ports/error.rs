//! Errors reported by the device and channel ports.

use thiserror::Error;

/// Failure of an external audio or channel primitive.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortError {
    /// The device could not be opened (missing, busy, permission denied).
    #[error("Audio device unavailable: {0}")]
    Unavailable(String),

    /// A capture call was rejected.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// A playback call was rejected.
    #[error("Playback failed: {0}")]
    Playback(String),

    /// The outbound agent channel rejected an utterance.
    #[error("Agent channel failed: {0}")]
    Channel(String),

    /// The dedicated audio thread is gone.
    #[error("Audio thread died unexpectedly")]
    AudioThreadDied,

    /// The port was used before `open`/`connect` succeeded.
    #[error("Device not initialised")]
    NotInitialised,
}
