//! Mock ports shared by the controller integration tests.
//!
//! Each mock keeps its state behind an `Arc<Mutex<_>>` so a test can hand
//! a boxed clone to the controller and keep another clone as a probe.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parley_core::{
    AgentChannel, CaptureDevice, CaptureFormat, CaptureFrame, EventBus, FrameSink, PlaybackDevice,
    PlaybackFormat, PortError, TrackId, TrackOffset, TurnEvent, Utterance,
};
use parley_voice::{TurnConfig, TurnController};

// ── Capture ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct CaptureProbe {
    /// Every sink installed, oldest first.
    pub sinks: Vec<FrameSink>,
    pub opens: usize,
    pub starts: usize,
    pub pauses: usize,
    pub clears: usize,
    pub fail_open: bool,
    pub fail_start: bool,
    pub fail_pause: bool,
}

#[derive(Clone, Default)]
pub struct MockCapture(pub Arc<Mutex<CaptureProbe>>);

impl MockCapture {
    pub fn probe(&self) -> std::sync::MutexGuard<'_, CaptureProbe> {
        self.0.lock().unwrap()
    }

    /// Push a frame through the most recently installed sink.
    pub fn push(&self, pcm: Vec<i16>, level: f32) {
        let mut probe = self.probe();
        let sink = probe.sinks.last_mut().expect("capture never started");
        sink(CaptureFrame {
            pcm,
            amplitudes: vec![level; 8],
        });
    }

    /// Push a frame through the sink installed by start number `index`.
    pub fn push_via(&self, index: usize, pcm: Vec<i16>, level: f32) {
        let mut probe = self.probe();
        let sink = &mut probe.sinks[index];
        sink(CaptureFrame {
            pcm,
            amplitudes: vec![level; 8],
        });
    }
}

#[async_trait]
impl CaptureDevice for MockCapture {
    async fn open(&self, _format: CaptureFormat) -> Result<(), PortError> {
        let mut probe = self.probe();
        probe.opens += 1;
        if probe.fail_open {
            return Err(PortError::Unavailable("no microphone".to_string()));
        }
        Ok(())
    }

    async fn start_streaming(&self, on_frame: FrameSink) -> Result<(), PortError> {
        let mut probe = self.probe();
        if probe.fail_start {
            return Err(PortError::Capture("stream refused".to_string()));
        }
        probe.starts += 1;
        probe.sinks.push(on_frame);
        Ok(())
    }

    async fn pause(&self) -> Result<(), PortError> {
        let mut probe = self.probe();
        if probe.fail_pause {
            return Err(PortError::Capture("pause refused".to_string()));
        }
        probe.pauses += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<(), PortError> {
        self.probe().clears += 1;
        Ok(())
    }
}

// ── Playback ───────────────────────────────────────────────────────

/// Reports an advancing offset for the last enqueued track until
/// [`MockPlayback::finish`] or an interrupt.
#[derive(Default)]
pub struct PlaybackProbe {
    pub connects: usize,
    pub fail_connect: bool,
    pub current: Option<TrackOffset>,
    pub enqueued: Vec<(TrackId, usize)>,
    pub interrupts: usize,
}

#[derive(Clone, Default)]
pub struct MockPlayback(pub Arc<Mutex<PlaybackProbe>>);

impl MockPlayback {
    pub fn probe(&self) -> std::sync::MutexGuard<'_, PlaybackProbe> {
        self.0.lock().unwrap()
    }

    /// The track ran out of audio.
    pub fn finish(&self) {
        self.probe().current = None;
    }
}

#[async_trait]
impl PlaybackDevice for MockPlayback {
    async fn connect(&self, _format: PlaybackFormat) -> Result<(), PortError> {
        let mut probe = self.probe();
        probe.connects += 1;
        if probe.fail_connect {
            return Err(PortError::Unavailable("no speaker".to_string()));
        }
        Ok(())
    }

    fn enqueue_pcm(&self, pcm: Vec<i16>, track: TrackId) -> Result<(), PortError> {
        let mut probe = self.probe();
        probe.enqueued.push((track, pcm.len()));
        if probe.current.is_none_or(|c| c.track != track) {
            probe.current = Some(TrackOffset { track, samples: 0 });
        }
        Ok(())
    }

    async fn interrupt(&self) -> Result<Option<TrackOffset>, PortError> {
        let mut probe = self.probe();
        probe.interrupts += 1;
        Ok(probe.current.take())
    }

    fn current_offset(&self) -> Option<TrackOffset> {
        let mut probe = self.probe();
        let current = probe.current.as_mut()?;
        current.samples += 480;
        Some(*current)
    }

    fn amplitude_summary(&self) -> Vec<f32> {
        if self.probe().current.is_some() {
            vec![0.5; 8]
        } else {
            Vec::new()
        }
    }
}

// ── Channel ────────────────────────────────────────────────────────

pub struct MockChannel {
    pub ready: AtomicBool,
    pub sent: Mutex<Vec<Utterance>>,
}

impl MockChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<Utterance> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentChannel for MockChannel {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn send_audio(&self, utterance: Utterance) -> Result<(), PortError> {
        self.sent.lock().unwrap().push(utterance);
        Ok(())
    }
}

// ── Event log ──────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<TurnEvent>>>);

impl EventLog {
    /// Subscribe to every topic on `bus`.
    pub fn attach(bus: &EventBus) -> Self {
        let log = Self::default();
        for topic in TurnEvent::ALL {
            let events = Arc::clone(&log.0);
            let _ = bus.subscribe(topic, move |event| {
                events.lock().unwrap().push(event);
                Ok(())
            });
        }
        log
    }

    pub fn count(&self, topic: TurnEvent) -> usize {
        self.0.lock().unwrap().iter().filter(|e| **e == topic).count()
    }

    pub fn all(&self) -> Vec<TurnEvent> {
        self.0.lock().unwrap().clone()
    }
}

// ── Harness ────────────────────────────────────────────────────────

pub struct Harness {
    pub controller: TurnController,
    pub capture: MockCapture,
    pub playback: MockPlayback,
    pub channel: Arc<MockChannel>,
    pub events: EventLog,
}

impl Harness {
    /// Build a controller over fresh mocks without initialising it.
    pub fn build(config: TurnConfig) -> Self {
        let capture = MockCapture::default();
        let playback = MockPlayback::default();
        let channel = MockChannel::new();
        let bus = EventBus::new();
        let events = EventLog::attach(&bus);

        let controller = TurnController::new(
            config,
            Box::new(capture.clone()),
            Box::new(playback.clone()),
            channel.clone(),
            bus,
        )
        .unwrap();

        Self {
            controller,
            capture,
            playback,
            channel,
            events,
        }
    }

    /// Build and initialise with default config.
    pub async fn ready() -> Self {
        Self::ready_with(TurnConfig::default()).await
    }

    pub async fn ready_with(config: TurnConfig) -> Self {
        let mut harness = Self::build(config);
        harness.controller.initialize().await.unwrap();
        harness
    }
}
