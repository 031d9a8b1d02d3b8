//! Dedicated audio I/O thread: keeps `!Send` device objects off the runtime.
//!
//! `cpal::Stream` and `rodio::OutputStream` are `!Send` on some platforms.
//! Both live on one OS thread for their whole lifetime; the
//! [`AudioThreadHandle`] proxy is `Send + Sync` and forwards every
//! operation as an [`AudioCommand`] over a std channel.
//!
//! Requests made from async port methods are answered on a tokio oneshot
//! and awaited, so the runtime thread is free while a device opens. The
//! synchronous port methods (enqueue and the polling queries) block on a
//! std reply instead; they only touch in-memory sink state.
//!
//! Devices are opened lazily by the first `OpenCapture` / `ConnectPlayback`
//! command, so a missing microphone does not prevent playback and vice
//! versa.

use std::sync::mpsc;
use std::thread;

use tokio::sync::oneshot;

use parley_core::{CaptureFormat, FrameSink, PlaybackFormat, PortError, TrackId, TrackOffset};

use crate::capture::AudioCapture;
use crate::gate::SuppressionGate;
use crate::playback::AudioPlayback;

type Reply<T> = mpsc::Sender<Result<T, PortError>>;
type AsyncReply<T> = oneshot::Sender<Result<T, PortError>>;

// ── Commands ───────────────────────────────────────────────────────

enum AudioCommand {
    OpenCapture {
        format: CaptureFormat,
        reply: AsyncReply<()>,
    },
    StartStreaming {
        sink: FrameSink,
        reply: AsyncReply<()>,
    },
    PauseCapture {
        reply: AsyncReply<()>,
    },
    ClearCapture {
        reply: AsyncReply<()>,
    },

    ConnectPlayback {
        format: PlaybackFormat,
        reply: AsyncReply<()>,
    },
    Enqueue {
        pcm: Vec<i16>,
        track: TrackId,
        reply: Reply<()>,
    },
    Interrupt {
        reply: AsyncReply<Option<TrackOffset>>,
    },
    CurrentOffset {
        reply: mpsc::Sender<Option<TrackOffset>>,
    },
    AmplitudeSummary {
        reply: mpsc::Sender<Vec<f32>>,
    },

    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// `Send + Sync` handle to the audio thread.
///
/// Async request methods yield until the thread answers; the synchronous
/// ones block the caller for the round-trip.
pub struct AudioThreadHandle {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AudioThreadHandle {
    /// Spawn the audio thread. No device is opened yet.
    pub fn spawn(gate: SuppressionGate) -> Result<Self, PortError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();

        let thread = thread::Builder::new()
            .name("parley-audio".into())
            .spawn(move || Self::run(&gate, &cmd_rx))
            .map_err(|e| PortError::Unavailable(format!("failed to spawn audio thread: {e}")))?;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    // ── Capture ────────────────────────────────────────────────────

    pub async fn open_capture(&self, format: CaptureFormat) -> Result<(), PortError> {
        self.request(|reply| AudioCommand::OpenCapture { format, reply })
            .await
    }

    pub async fn start_streaming(&self, sink: FrameSink) -> Result<(), PortError> {
        self.request(|reply| AudioCommand::StartStreaming { sink, reply })
            .await
    }

    pub async fn pause_capture(&self) -> Result<(), PortError> {
        self.request(|reply| AudioCommand::PauseCapture { reply })
            .await
    }

    pub async fn clear_capture(&self) -> Result<(), PortError> {
        self.request(|reply| AudioCommand::ClearCapture { reply })
            .await
    }

    // ── Playback ───────────────────────────────────────────────────

    pub async fn connect_playback(&self, format: PlaybackFormat) -> Result<(), PortError> {
        self.request(|reply| AudioCommand::ConnectPlayback { format, reply })
            .await
    }

    pub fn enqueue(&self, pcm: Vec<i16>, track: TrackId) -> Result<(), PortError> {
        self.send_and_recv(|reply| AudioCommand::Enqueue { pcm, track, reply })
    }

    pub async fn interrupt(&self) -> Result<Option<TrackOffset>, PortError> {
        self.request(|reply| AudioCommand::Interrupt { reply })
            .await
    }

    /// `None` when idle or when the thread is gone.
    pub fn current_offset(&self) -> Option<TrackOffset> {
        self.query(|reply| AudioCommand::CurrentOffset { reply })
            .flatten()
    }

    pub fn amplitude_summary(&self) -> Vec<f32> {
        self.query(|reply| AudioCommand::AmplitudeSummary { reply })
            .unwrap_or_default()
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Send a command and await its `Result` reply without blocking the
    /// runtime. A dead thread maps to [`PortError::AudioThreadDied`].
    async fn request<T>(
        &self,
        build: impl FnOnce(AsyncReply<T>) -> AudioCommand,
    ) -> Result<T, PortError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(build(tx))
            .map_err(|_| PortError::AudioThreadDied)?;
        rx.await.map_err(|_| PortError::AudioThreadDied)?
    }

    /// Send a command and block on its `Result` reply. A dead thread maps
    /// to [`PortError::AudioThreadDied`].
    fn send_and_recv<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> AudioCommand,
    ) -> Result<T, PortError> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx
            .send(build(tx))
            .map_err(|_| PortError::AudioThreadDied)?;
        rx.recv().map_err(|_| PortError::AudioThreadDied)?
    }

    /// Like `send_and_recv` for bare values; `None` if the thread is dead.
    fn query<T>(&self, build: impl FnOnce(mpsc::Sender<T>) -> AudioCommand) -> Option<T> {
        let (tx, rx) = mpsc::channel();
        self.cmd_tx.send(build(tx)).ok()?;
        rx.recv().ok()
    }

    // ── Audio thread event loop ────────────────────────────────────

    fn run(gate: &SuppressionGate, cmd_rx: &mpsc::Receiver<AudioCommand>) {
        let mut capture: Option<AudioCapture> = None;
        let mut playback: Option<AudioPlayback> = None;

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::OpenCapture { format, reply } => {
                    let result = if capture.is_some() {
                        Ok(())
                    } else {
                        AudioCapture::open(format, gate.clone()).map(|c| {
                            capture = Some(c);
                        })
                    };
                    let _ = reply.send(result);
                }

                AudioCommand::StartStreaming { sink, reply } => {
                    let result = capture
                        .as_mut()
                        .ok_or(PortError::NotInitialised)
                        .and_then(|c| c.start_streaming(sink));
                    let _ = reply.send(result);
                }

                AudioCommand::PauseCapture { reply } => {
                    let result = capture
                        .as_mut()
                        .ok_or(PortError::NotInitialised)
                        .and_then(AudioCapture::pause);
                    let _ = reply.send(result);
                }

                AudioCommand::ClearCapture { reply } => {
                    let result = capture
                        .as_ref()
                        .ok_or(PortError::NotInitialised)
                        .map(AudioCapture::clear);
                    let _ = reply.send(result);
                }

                AudioCommand::ConnectPlayback { format, reply } => {
                    let result = if playback.is_some() {
                        Ok(())
                    } else {
                        AudioPlayback::connect(format, gate.clone()).map(|p| {
                            playback = Some(p);
                        })
                    };
                    let _ = reply.send(result);
                }

                AudioCommand::Enqueue { pcm, track, reply } => {
                    let result = playback
                        .as_mut()
                        .ok_or(PortError::NotInitialised)
                        .and_then(|p| p.enqueue(pcm, track));
                    let _ = reply.send(result);
                }

                AudioCommand::Interrupt { reply } => {
                    let result = playback
                        .as_mut()
                        .ok_or(PortError::NotInitialised)
                        .map(AudioPlayback::interrupt);
                    let _ = reply.send(result);
                }

                AudioCommand::CurrentOffset { reply } => {
                    let _ = reply.send(playback.as_mut().and_then(AudioPlayback::current_offset));
                }

                AudioCommand::AmplitudeSummary { reply } => {
                    let summary = playback
                        .as_mut()
                        .map(AudioPlayback::amplitude_summary)
                        .unwrap_or_default();
                    let _ = reply.send(summary);
                }

                AudioCommand::Shutdown => break,
            }
        }

        // Devices are dropped here, on the audio thread.
        gate.release();
        tracing::debug!("Audio thread shutting down");
    }
}

impl Drop for AudioThreadHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_are_answered_without_devices() {
        let handle = AudioThreadHandle::spawn(SuppressionGate::new()).unwrap();

        let (paused, cleared) = tokio::join!(handle.pause_capture(), handle.clear_capture());
        assert!(matches!(paused, Err(PortError::NotInitialised)));
        assert!(matches!(cleared, Err(PortError::NotInitialised)));
        assert!(matches!(handle.interrupt().await, Err(PortError::NotInitialised)));

        assert!(handle.current_offset().is_none());
        assert!(handle.amplitude_summary().is_empty());
    }

    #[tokio::test]
    async fn test_dead_thread_is_reported() {
        let mut handle = AudioThreadHandle::spawn(SuppressionGate::new()).unwrap();
        handle.cmd_tx.send(AudioCommand::Shutdown).unwrap();
        handle.thread.take().unwrap().join().unwrap();

        assert!(matches!(
            handle.open_capture(CaptureFormat::default()).await,
            Err(PortError::AudioThreadDied)
        ));
        assert!(matches!(handle.clear_capture().await, Err(PortError::AudioThreadDied)));
        assert!(matches!(
            handle.enqueue(vec![0; 4], TrackId::new()),
            Err(PortError::AudioThreadDied)
        ));
        assert!(handle.current_offset().is_none());
    }
}
