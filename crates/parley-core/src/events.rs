//! Canonical turn-taking event union.
//!
//! This module is the single source of truth for the topics carried on the
//! [`EventBus`](crate::bus::EventBus). Every topic is a variant of
//! [`TurnEvent`], so subscribers match exhaustively instead of comparing
//! string literals.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag so a web front end can consume
//! the same union:
//!
//! ```json
//! { "type": "playback_ended" }
//! ```

use serde::{Deserialize, Serialize};

/// Topics published by the turn-taking controller and its playback monitor.
///
/// None of the topics carry a payload: observers read the details they need
/// from the controller snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// The playback monitor observed the reply track advancing for the
    /// first time in a playback session.
    PlaybackStarted,

    /// The reply track ran out of audio without being interrupted.
    ///
    /// Published exactly once per playback session.
    PlaybackEnded,

    /// A turn session began capturing microphone frames.
    RecordingStarted,

    /// A turn session stopped capturing and its utterance was handed off.
    RecordingEnded,

    /// A new turn session started; detector state latched by a previous
    /// session must be discarded.
    ResetDetection,
}

impl TurnEvent {
    /// All topics, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::PlaybackStarted,
        Self::PlaybackEnded,
        Self::RecordingStarted,
        Self::RecordingEnded,
        Self::ResetDetection,
    ];

    /// Get the event name for logs and wire protocols.
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::PlaybackStarted => "audio:playback:started",
            Self::PlaybackEnded => "audio:playback:ended",
            Self::RecordingStarted => "audio:recording:started",
            Self::RecordingEnded => "audio:recording:ended",
            Self::ResetDetection => "audio:detection:reset",
        }
    }
}

impl std::fmt::Display for TurnEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_name())
    }
}
