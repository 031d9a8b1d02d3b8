//! PCM domain types shared by the controller and the device ports.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one logical streamed reply.
///
/// Chunks enqueued under different track ids are never concatenated by the
/// playback device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(Uuid);

impl TrackId {
    /// Allocate a fresh random track id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Position of the playback device inside the track it is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackOffset {
    /// Track the position belongs to.
    pub track: TrackId,
    /// Samples played so far in that track.
    pub samples: u64,
}

/// Format of the frames pushed by a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFormat {
    /// PCM16 mono sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per pushed frame.
    pub frame_size: usize,
    /// Number of amplitude bands summarised per frame.
    pub bands: usize,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            frame_size: 1024,
            bands: 30,
        }
    }
}

/// Format the playback device is connected with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackFormat {
    /// PCM16 mono sample rate in Hz.
    pub sample_rate: u32,
}

impl Default for PlaybackFormat {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
        }
    }
}

/// One frame pushed by the capture device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureFrame {
    /// Raw PCM16 mono samples.
    pub pcm: Vec<i16>,
    /// Amplitude summary of the frame, each value normalised to roughly
    /// `[0, 1]`.
    pub amplitudes: Vec<f32>,
}

/// Why a turn session was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    /// The user pressed stop-and-send.
    Manual,
    /// The silence debounce window elapsed after speech.
    Silence,
}

/// A completed user utterance, handed to the agent channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Track the agent's reply to this utterance will be played on.
    pub track: TrackId,
    /// All captured frames merged in their original order.
    pub pcm: Vec<i16>,
    /// Sample rate of `pcm`.
    pub sample_rate: u32,
    /// What ended the turn.
    pub reason: SubmitReason,
}

impl Utterance {
    /// Duration of the utterance in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.pcm.len() as u64 * 1000 / u64::from(self.sample_rate)
    }
}
