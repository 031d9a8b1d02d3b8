//! Key gestures driving a controller over silent in-memory devices, with
//! the echo channel as the agent.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use parley_cli::presentation::{Gesture, apply, render_mic_control};
use parley_cli::{EchoChannel, forward_replies};
use parley_core::{
    CaptureDevice, CaptureFormat, CaptureFrame, EventBus, FrameSink, PlaybackDevice,
    PlaybackFormat, PortError, TrackId, TrackOffset,
};
use parley_voice::{ControllerHandle, TurnConfig, TurnController, TurnError, TurnState};

#[derive(Clone, Default)]
struct Mic(Arc<Mutex<Option<FrameSink>>>);

impl Mic {
    fn push(&self, pcm: Vec<i16>, level: f32) {
        if let Some(sink) = self.0.lock().unwrap().as_mut() {
            sink(CaptureFrame {
                pcm,
                amplitudes: vec![level; 8],
            });
        }
    }
}

#[async_trait]
impl CaptureDevice for Mic {
    async fn open(&self, _format: CaptureFormat) -> Result<(), PortError> {
        Ok(())
    }

    async fn start_streaming(&self, on_frame: FrameSink) -> Result<(), PortError> {
        *self.0.lock().unwrap() = Some(on_frame);
        Ok(())
    }

    async fn pause(&self) -> Result<(), PortError> {
        *self.0.lock().unwrap() = None;
        Ok(())
    }

    async fn clear(&self) -> Result<(), PortError> {
        Ok(())
    }
}

/// Plays every enqueued sample instantly: the first poll sees the track,
/// the next one sees it finished.
#[derive(Clone, Default)]
struct Speaker(Arc<Mutex<Option<TrackOffset>>>);

#[async_trait]
impl PlaybackDevice for Speaker {
    async fn connect(&self, _format: PlaybackFormat) -> Result<(), PortError> {
        Ok(())
    }

    fn enqueue_pcm(&self, pcm: Vec<i16>, track: TrackId) -> Result<(), PortError> {
        *self.0.lock().unwrap() = Some(TrackOffset {
            track,
            samples: pcm.len() as u64,
        });
        Ok(())
    }

    async fn interrupt(&self) -> Result<Option<TrackOffset>, PortError> {
        Ok(self.0.lock().unwrap().take())
    }

    fn current_offset(&self) -> Option<TrackOffset> {
        self.0.lock().unwrap().take()
    }

    fn amplitude_summary(&self) -> Vec<f32> {
        Vec::new()
    }
}

async fn spawn_controller() -> (ControllerHandle, Mic, tokio::task::JoinHandle<()>) {
    let mic = Mic::default();
    let (channel, replies) = EchoChannel::new(Duration::from_millis(200), 24_000);
    let mut controller = TurnController::new(
        TurnConfig::default(),
        Box::new(mic.clone()),
        Box::new(Speaker::default()),
        Arc::new(channel),
        EventBus::new(),
    )
    .unwrap();
    controller.initialize().await.unwrap();

    let handle = controller.handle();
    let driver = tokio::spawn(controller.run());
    tokio::spawn(forward_replies(replies, handle.clone()));
    (handle, mic, driver)
}

#[tokio::test(start_paused = true)]
async fn space_toggles_and_echo_resumes_listening() {
    let (handle, mic, driver) = spawn_controller().await;

    assert!(apply(Gesture::Toggle, &handle, &handle.snapshot()).await.unwrap());
    assert_eq!(handle.snapshot().state, TurnState::Capturing);

    mic.push(vec![500; 480], 0.8);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(apply(Gesture::Toggle, &handle, &handle.snapshot()).await.unwrap());
    assert_eq!(handle.snapshot().state, TurnState::Idle);

    // The echo arrives, plays, ends and the mic reopens on its own.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(handle.snapshot().state, TurnState::Capturing);
    assert!(render_mic_control(&handle.snapshot(), None).starts_with("[ REC ]"));

    assert!(!apply(Gesture::Quit, &handle, &handle.snapshot()).await.unwrap());
    driver.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn escape_cancels_and_auto_resume_toggles() {
    let (handle, _mic, driver) = spawn_controller().await;

    apply(Gesture::Toggle, &handle, &handle.snapshot()).await.unwrap();
    apply(Gesture::Cancel, &handle, &handle.snapshot()).await.unwrap();
    assert_eq!(handle.snapshot().state, TurnState::Idle);

    apply(Gesture::ToggleAutoResume, &handle, &handle.snapshot()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.snapshot().auto_resume);

    apply(Gesture::Quit, &handle, &handle.snapshot()).await.unwrap();
    driver.await.unwrap();

    let err = apply(Gesture::Toggle, &handle, &handle.snapshot()).await;
    assert_eq!(err, Err(TurnError::ControllerStopped));
}
