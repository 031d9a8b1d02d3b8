//! Capture and playback primitives.
//!
//! Both traits are **object-safe** (`Box<dyn CaptureDevice>` /
//! `Box<dyn PlaybackDevice>`) and take `&self`; implementations use interior
//! mutability (channels, atomics) so the controller can own them boxed.
//!
//! | Implementor | Where used |
//! |---|---|
//! | `LocalCapture` / `LocalPlayback` (parley-voice) | Desktop / CLI, cpal capture + rodio playback |
//! | Test mocks | Headless controller tests |

use async_trait::async_trait;

use super::PortError;
use crate::audio::{CaptureFormat, CaptureFrame, PlaybackFormat, TrackId, TrackOffset};

/// Push callback receiving captured frames in order.
///
/// Invoked from whatever thread the device produces audio on.
pub type FrameSink = Box<dyn FnMut(CaptureFrame) + Send + 'static>;

// ── CaptureDevice ──────────────────────────────────────────────────

/// Microphone capture primitive.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire the input device. Called once at startup.
    async fn open(&self, format: CaptureFormat) -> Result<(), PortError>;

    /// Start pushing frames to `on_frame` until [`pause`](Self::pause).
    ///
    /// Replaces any sink installed by an earlier call.
    async fn start_streaming(&self, on_frame: FrameSink) -> Result<(), PortError>;

    /// Stop pushing frames. The device stays open.
    async fn pause(&self) -> Result<(), PortError>;

    /// Drop any partially assembled frame.
    async fn clear(&self) -> Result<(), PortError>;
}

// ── PlaybackDevice ─────────────────────────────────────────────────

/// Speaker playback primitive.
///
/// The device exposes no "ended" notification; callers poll
/// [`current_offset`](Self::current_offset) and infer the end of a track
/// from it returning `None`.
#[async_trait]
pub trait PlaybackDevice: Send + Sync {
    /// Acquire the output device. Called once at startup.
    async fn connect(&self, format: PlaybackFormat) -> Result<(), PortError>;

    /// Queue PCM16 mono samples on `track`.
    ///
    /// Samples for the track already playing are appended; samples for a
    /// different track replace it.
    fn enqueue_pcm(&self, pcm: Vec<i16>, track: TrackId) -> Result<(), PortError>;

    /// Stop playback immediately and discard queued audio.
    ///
    /// Returns the position reached, if anything was playing.
    async fn interrupt(&self) -> Result<Option<TrackOffset>, PortError>;

    /// Position inside the current track, or `None` when nothing is
    /// advancing (never started, exhausted, or interrupted).
    fn current_offset(&self) -> Option<TrackOffset>;

    /// Amplitude summary of the audio around the current position, each
    /// value normalised to roughly `[0, 1]`. Empty when idle.
    fn amplitude_summary(&self) -> Vec<f32>;
}
