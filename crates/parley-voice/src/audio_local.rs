//! Local (cpal/rodio) implementations of the device ports.
//!
//! [`LocalCapture`] and [`LocalPlayback`] share a **single**
//! `Arc<AudioThreadHandle>`: one OS thread owns both the cpal input stream
//! and the rodio output. They also share one [`SuppressionGate`], so the
//! microphone is muted at the device level while the speaker is fed.
//!
//! ```no_run
//! # use parley_voice::audio_local::new_pair;
//! # use parley_voice::SuppressionGate;
//! let (capture, playback) = new_pair(&SuppressionGate::new())?;
//! # Ok::<(), parley_core::PortError>(())
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::{
    CaptureDevice, CaptureFormat, FrameSink, PlaybackDevice, PlaybackFormat, PortError, TrackId,
    TrackOffset,
};

use crate::audio_thread::AudioThreadHandle;
use crate::gate::SuppressionGate;

// ── LocalCapture ───────────────────────────────────────────────────

/// Default microphone, via the shared audio thread.
pub struct LocalCapture {
    handle: Arc<AudioThreadHandle>,
}

#[async_trait]
impl CaptureDevice for LocalCapture {
    async fn open(&self, format: CaptureFormat) -> Result<(), PortError> {
        self.handle.open_capture(format).await
    }

    async fn start_streaming(&self, on_frame: FrameSink) -> Result<(), PortError> {
        self.handle.start_streaming(on_frame).await
    }

    async fn pause(&self) -> Result<(), PortError> {
        self.handle.pause_capture().await
    }

    async fn clear(&self) -> Result<(), PortError> {
        self.handle.clear_capture().await
    }
}

// ── LocalPlayback ──────────────────────────────────────────────────

/// Default speaker, via the shared audio thread.
pub struct LocalPlayback {
    handle: Arc<AudioThreadHandle>,
}

#[async_trait]
impl PlaybackDevice for LocalPlayback {
    async fn connect(&self, format: PlaybackFormat) -> Result<(), PortError> {
        self.handle.connect_playback(format).await
    }

    fn enqueue_pcm(&self, pcm: Vec<i16>, track: TrackId) -> Result<(), PortError> {
        self.handle.enqueue(pcm, track)
    }

    async fn interrupt(&self) -> Result<Option<TrackOffset>, PortError> {
        self.handle.interrupt().await
    }

    fn current_offset(&self) -> Option<TrackOffset> {
        self.handle.current_offset()
    }

    fn amplitude_summary(&self) -> Vec<f32> {
        self.handle.amplitude_summary()
    }
}

// ── Constructor ────────────────────────────────────────────────────

/// Spawn one audio thread and return the capture/playback pair sharing it.
///
/// No device is opened until the controller initialises the pair.
pub fn new_pair(gate: &SuppressionGate) -> Result<(LocalCapture, LocalPlayback), PortError> {
    let handle = Arc::new(AudioThreadHandle::spawn(gate.clone())?);
    let capture = LocalCapture {
        handle: Arc::clone(&handle),
    };
    let playback = LocalPlayback { handle };
    Ok((capture, playback))
}
