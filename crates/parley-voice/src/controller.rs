//! Turn-taking controller: decides when the microphone is open.
//!
//! ```text
//!                  start (manual / auto-resume)
//!        ┌──────────────────────────────────────────┐
//!        │                                          ▼
//!      Idle ◀──── submit / cancel ──────────── Capturing
//!        ▲                                          │
//!        │ playback ended                           │ playback started
//!        │ (no auto-resume)                         │ (session not held)
//!        │                                          ▼
//!        └─────────────────────────────────────  Suppressed
//!                 playback ended + auto-resume ──▶ Capturing
//! ```
//!
//! The state is derived, never stored: an open [`TurnSession`] means
//! `Capturing`, otherwise an active [`PlaybackMonitor`] means `Suppressed`,
//! otherwise `Idle`.
//!
//! # Ordering
//!
//! The controller subscribes to its own bus topics. Those handlers only
//! enqueue a [`Command::Bus`] on the controller's command queue, so the
//! reaction to `playback-ended` (auto-resume) always runs after the update
//! that published it has completed. The same queue carries user commands,
//! captured frames and reply audio; [`TurnController::run`] drains it
//! interleaved with the polling ticks.

use std::sync::Arc;
use std::time::Instant;

use parley_core::{
    AgentChannel, CaptureDevice, CaptureFrame, EventBus, FrameSink, PlaybackDevice,
    SubmitReason, Subscription, TrackId, TurnEvent, Utterance,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;

use crate::activity::{ActivityDetector, ActivityEvent};
use crate::config::TurnConfig;
use crate::error::TurnError;
use crate::handle::ControllerHandle;
use crate::levels;
use crate::monitor::{PlaybackMonitor, PlaybackTransition};
use crate::session::{CaptureOrigin, SessionId, TurnSession};

// ── State ──────────────────────────────────────────────────────────

/// Externally visible controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TurnState {
    /// Microphone closed, nothing playing.
    #[default]
    Idle,

    /// A Turn Session is open and accumulating frames.
    Capturing,

    /// A reply is playing; capture is forbidden.
    Suppressed,
}

/// Everything the presentation layer needs to render the mic control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ControllerSnapshot {
    /// Current state.
    pub state: TurnState,

    /// Capture opened, playback connected and the agent channel ready.
    pub ready: bool,

    /// Whether capture resumes by itself after a reply.
    pub auto_resume: bool,

    /// Speech detected in the current Turn Session.
    pub has_spoken: bool,

    /// Levels of the last captured frame.
    pub capture_levels: Vec<f32>,

    /// Levels around the current playback position.
    pub playback_levels: Vec<f32>,
}

impl ControllerSnapshot {
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.state == TurnState::Capturing
    }

    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.state == TurnState::Suppressed
    }
}

// ── Commands ───────────────────────────────────────────────────────

pub(crate) type Reply = oneshot::Sender<Result<(), TurnError>>;

/// Work items processed by the controller, in arrival order.
pub(crate) enum Command {
    StartCapture { reply: Reply },
    StopAndSend { reply: Reply },
    Cancel { reply: Reply },
    SetAutoResume(bool),
    ReplyAudio(Vec<i16>),
    Frame { session: SessionId, frame: CaptureFrame },
    Bus(TurnEvent),
    Shutdown,
}

// ── Controller ─────────────────────────────────────────────────────

/// The turn-taking state machine.
///
/// Owns the capture and playback devices exclusively. Drive it either by
/// calling the methods directly (tests) or by spawning [`run`](Self::run)
/// and talking to it through a [`ControllerHandle`].
pub struct TurnController {
    config: TurnConfig,

    capture: Box<dyn CaptureDevice>,
    playback: Box<dyn PlaybackDevice>,
    channel: Arc<dyn AgentChannel>,

    bus: EventBus,
    subscriptions: Vec<Subscription>,

    monitor: PlaybackMonitor,
    session: Option<TurnSession>,

    capture_ready: bool,
    playback_ready: bool,
    auto_resume: bool,

    /// Track the next reply chunks are enqueued on.
    reply_track: TrackId,

    capture_levels: Vec<f32>,
    playback_levels: Vec<f32>,

    /// Last state reported, for transition logging.
    state: TurnState,

    cmd_tx: mpsc::UnboundedSender<Command>,
    cmd_rx: Option<mpsc::UnboundedReceiver<Command>>,
    snapshot_tx: watch::Sender<ControllerSnapshot>,
}

impl TurnController {
    /// Create a controller and subscribe it to its own bus topics.
    ///
    /// The devices are not touched until [`initialize`](Self::initialize).
    pub fn new(
        config: TurnConfig,
        capture: Box<dyn CaptureDevice>,
        playback: Box<dyn PlaybackDevice>,
        channel: Arc<dyn AgentChannel>,
        bus: EventBus,
    ) -> Result<Self, TurnError> {
        config.validate()?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let subscriptions = [
            TurnEvent::PlaybackStarted,
            TurnEvent::PlaybackEnded,
            TurnEvent::ResetDetection,
        ]
        .into_iter()
        .map(|topic| {
            let tx = cmd_tx.clone();
            bus.subscribe(topic, move |event| {
                tx.send(Command::Bus(event))
                    .map_err(|_| anyhow::anyhow!("turn controller stopped"))
            })
        })
        .collect();

        let monitor = PlaybackMonitor::new(config.monitor.start_grace_ticks());
        let capture_levels = vec![0.0; config.capture.level_bars];
        let playback_levels = vec![0.0; config.playback.level_bars];
        let auto_resume = config.auto_resume;

        let (snapshot_tx, _) = watch::channel(ControllerSnapshot {
            auto_resume,
            capture_levels: capture_levels.clone(),
            playback_levels: playback_levels.clone(),
            ..ControllerSnapshot::default()
        });

        Ok(Self {
            config,
            capture,
            playback,
            channel,
            bus,
            subscriptions,
            monitor,
            session: None,
            capture_ready: false,
            playback_ready: false,
            auto_resume,
            reply_track: TrackId::new(),
            capture_levels,
            playback_levels,
            state: TurnState::Idle,
            cmd_tx,
            cmd_rx: Some(cmd_rx),
            snapshot_tx,
        })
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Open the capture device and connect the playback device.
    ///
    /// Both are attempted; the first failure is returned and the
    /// controller stays not-ready. No retry is made.
    pub async fn initialize(&mut self) -> Result<(), TurnError> {
        let mut first_error = None;

        match self.capture.open(self.config.capture.format()).await {
            Ok(()) => self.capture_ready = true,
            Err(e) => {
                tracing::warn!(error = %e, "Capture device unavailable");
                first_error.get_or_insert(e);
            }
        }

        match self.playback.connect(self.config.playback.format()).await {
            Ok(()) => self.playback_ready = true,
            Err(e) => {
                tracing::warn!(error = %e, "Playback device unavailable");
                first_error.get_or_insert(e);
            }
        }

        self.refresh();

        match first_error {
            Some(e) => Err(e.into()),
            None => {
                tracing::info!(ready = self.is_ready(), "Turn controller initialised");
                Ok(())
            }
        }
    }

    /// A handle for driving the controller from other tasks.
    #[must_use]
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle::new(self.cmd_tx.clone(), self.snapshot_tx.subscribe())
    }

    /// Process commands and ticks until [`ControllerHandle::shutdown`].
    pub async fn run(mut self) {
        let Some(mut rx) = self.cmd_rx.take() else {
            tracing::error!("Turn controller command queue already taken");
            return;
        };

        let mut ticker = tokio::time::interval(self.config.monitor.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            poll_ms = self.config.monitor.poll_interval_ms,
            "Turn controller running"
        );

        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
                at = ticker.tick() => {
                    self.tick(at.into_std()).await;
                }
            }
        }

        self.release().await;
        tracing::info!("Turn controller stopped");
    }

    /// Process every queued command without waiting.
    ///
    /// Returns the number of commands handled.
    pub async fn pump(&mut self) -> usize {
        let Some(mut rx) = self.cmd_rx.take() else {
            return 0;
        };

        let mut handled = 0;
        while let Ok(cmd) = rx.try_recv() {
            handled += 1;
            if !self.handle_command(cmd).await {
                break;
            }
        }

        self.cmd_rx = Some(rx);
        handled
    }

    // ── Actions ────────────────────────────────────────────────────

    /// Open a Turn Session on user request.
    ///
    /// Playback is interrupted once capture is streaming; a refused start
    /// leaves playback and the reply track as they were. Does nothing if
    /// already capturing.
    pub async fn start_capture(&mut self) -> Result<(), TurnError> {
        let result = self.open_session(CaptureOrigin::Manual).await;
        self.refresh();
        result
    }

    /// End the Turn Session and hand its audio to the agent channel.
    pub async fn stop_and_send(&mut self) -> Result<(), TurnError> {
        let result = match self.session.take() {
            Some(session) => self.submit(session, SubmitReason::Manual).await,
            None => Err(TurnError::NotCapturing),
        };
        self.refresh();
        result
    }

    /// Discard the Turn Session, if any, and interrupt playback, if any.
    ///
    /// Nothing is sent and no bus event is published.
    pub async fn cancel(&mut self) -> Result<(), TurnError> {
        let result = self.cancel_inner().await;
        self.refresh();
        result
    }

    /// Enable or disable hands-free continuation.
    pub fn set_auto_resume(&mut self, enabled: bool) {
        if self.auto_resume != enabled {
            tracing::info!(enabled, "Auto-resume changed");
            self.auto_resume = enabled;
        }
        self.refresh();
    }

    /// Queue one chunk of reply audio on the current reply track.
    ///
    /// Chunks arriving while the user holds the turn are dropped.
    pub fn enqueue_reply(&mut self, pcm: Vec<i16>) -> Result<(), TurnError> {
        let result = self.enqueue_inner(pcm);
        self.refresh();
        result
    }

    /// Poll playback and evaluate the silence detector.
    pub async fn tick(&mut self, now: Instant) {
        self.poll_playback();

        let event = self
            .session
            .as_mut()
            .and_then(|session| session.detector_mut().evaluate(now));

        if event == Some(ActivityEvent::UtteranceComplete)
            && let Some(session) = self.session.take()
            && let Err(e) = self.submit(session, SubmitReason::Silence).await
        {
            tracing::warn!(error = %e, "Silence submit failed");
        }

        self.refresh();
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// Current derived state.
    #[must_use]
    pub fn state(&self) -> TurnState {
        if self.session.is_some() {
            TurnState::Capturing
        } else if self.monitor.is_active() {
            TurnState::Suppressed
        } else {
            TurnState::Idle
        }
    }

    /// Capture opened, playback connected and channel ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.capture_ready && self.playback_ready && self.channel.is_ready()
    }

    #[must_use]
    pub const fn auto_resume(&self) -> bool {
        self.auto_resume
    }

    /// Track reply chunks are currently enqueued on.
    #[must_use]
    pub const fn reply_track(&self) -> TrackId {
        self.reply_track
    }

    /// The playback monitor, for inspection.
    #[must_use]
    pub const fn monitor(&self) -> &PlaybackMonitor {
        &self.monitor
    }

    /// Bus the controller publishes on.
    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Build a snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.state(),
            ready: self.is_ready(),
            auto_resume: self.auto_resume,
            has_spoken: self
                .session
                .as_ref()
                .is_some_and(|s| s.detector().has_spoken()),
            capture_levels: self.capture_levels.clone(),
            playback_levels: self.playback_levels.clone(),
        }
    }

    // ── Command dispatch ───────────────────────────────────────────

    /// Returns `false` when the controller should stop.
    async fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::StartCapture { reply } => {
                let result = self.start_capture().await;
                let _ = reply.send(result);
            }
            Command::StopAndSend { reply } => {
                let result = self.stop_and_send().await;
                let _ = reply.send(result);
            }
            Command::Cancel { reply } => {
                let result = self.cancel().await;
                let _ = reply.send(result);
            }
            Command::SetAutoResume(enabled) => self.set_auto_resume(enabled),
            Command::ReplyAudio(pcm) => {
                if let Err(e) = self.enqueue_reply(pcm) {
                    tracing::warn!(error = %e, "Failed to enqueue reply audio");
                }
            }
            Command::Frame { session, frame } => {
                self.accept_frame(session, frame);
                self.refresh();
            }
            Command::Bus(event) => {
                self.on_bus_event(event).await;
                self.refresh();
            }
            Command::Shutdown => return false,
        }
        true
    }

    async fn on_bus_event(&mut self, event: TurnEvent) {
        match event {
            TurnEvent::PlaybackStarted => self.on_playback_started().await,
            TurnEvent::PlaybackEnded => self.on_playback_ended().await,
            TurnEvent::ResetDetection => {
                if let Some(session) = self.session.as_mut() {
                    session.detector_mut().reset();
                    tracing::trace!(session = %session.id(), "Detection reset");
                }
            }
            TurnEvent::RecordingStarted | TurnEvent::RecordingEnded => {}
        }
    }

    /// Playback began: suppress an unheld session, or let a held one win.
    ///
    /// If capture refuses to pause, the session is kept and playback is
    /// interrupted instead, so the two are never active together.
    async fn on_playback_started(&mut self) {
        if !self.monitor.is_active() {
            return;
        }
        let Some(held) = self.session.as_ref().map(TurnSession::is_held) else {
            return;
        };

        if held {
            tracing::info!("User holds the turn, interrupting reply playback");
            self.interrupt_playback().await;
            return;
        }

        if let Some(session) = self.session.take() {
            match self.capture.pause().await {
                Ok(()) => {
                    self.capture_levels.fill(0.0);
                    tracing::debug!(
                        session = %session.id(),
                        "Playback started, unheld session dropped"
                    );
                }
                Err(e) => {
                    // Capture cannot be stopped, so the reply gives way.
                    tracing::warn!(error = %e, "Failed to pause capture, interrupting playback");
                    self.session = Some(session);
                    self.interrupt_playback().await;
                }
            }
        }
    }

    /// Playback ran out: resume capture if everything allows it.
    async fn on_playback_ended(&mut self) {
        if !self.auto_resume {
            tracing::debug!("Playback ended, auto-resume disabled");
            return;
        }
        if !self.is_ready() {
            tracing::debug!("Playback ended, controller not ready");
            return;
        }
        if self.session.is_some() {
            tracing::debug!("Playback ended, already capturing");
            return;
        }
        if self.monitor.is_active() {
            tracing::debug!("Playback ended, another reply already queued");
            return;
        }

        tracing::debug!("Playback ended, resuming capture");
        if let Err(e) = self.open_session(CaptureOrigin::AutoResume).await {
            tracing::warn!(error = %e, "Auto-resume failed");
        }
    }

    // ── Internals ──────────────────────────────────────────────────

    async fn open_session(&mut self, origin: CaptureOrigin) -> Result<(), TurnError> {
        if !self.is_ready() {
            return Err(TurnError::NotReady);
        }
        if self.session.is_some() {
            tracing::debug!(?origin, "Start ignored, already capturing");
            return Ok(());
        }

        // Fallible device steps first: a refused start leaves playback,
        // the reply track and detection untouched.
        if let Err(e) = self.capture.clear().await {
            tracing::warn!(error = %e, "Failed to clear capture buffer");
            return Err(e.into());
        }

        let session = TurnSession::new(
            origin,
            ActivityDetector::new(&self.config.activity),
            Instant::now(),
        );
        let id = session.id();

        if let Err(e) = self.capture.start_streaming(self.frame_sink(id)).await {
            tracing::warn!(error = %e, "Failed to start capture");
            return Err(e.into());
        }

        self.interrupt_playback().await;
        self.reply_track = TrackId::new();
        self.bus.publish(TurnEvent::ResetDetection);

        tracing::info!(session = %id, ?origin, track = %self.reply_track, "Turn session started");
        self.session = Some(session);
        self.bus.publish(TurnEvent::RecordingStarted);
        Ok(())
    }

    /// Stop capture and ship the session's audio.
    ///
    /// If capture refuses to stop, the session is put back.
    async fn submit(&mut self, session: TurnSession, reason: SubmitReason) -> Result<(), TurnError> {
        if let Err(e) = self.capture.pause().await {
            tracing::warn!(error = %e, "Failed to stop capture, session kept open");
            self.session = Some(session);
            return Err(e.into());
        }
        self.capture_levels.fill(0.0);

        let id = session.id();
        let utterance = Utterance {
            track: self.reply_track,
            pcm: session.into_pcm(),
            sample_rate: self.config.capture.sample_rate,
            reason,
        };

        let result = if utterance.pcm.is_empty() {
            tracing::debug!(session = %id, ?reason, "Empty utterance, nothing sent");
            Ok(())
        } else {
            tracing::info!(
                session = %id,
                ?reason,
                samples = utterance.pcm.len(),
                duration_ms = utterance.duration_ms(),
                "Utterance complete"
            );
            self.channel.send_audio(utterance).await.map_err(|e| {
                tracing::warn!(error = %e, "Agent channel rejected utterance");
                TurnError::from(e)
            })
        };

        self.bus.publish(TurnEvent::RecordingEnded);
        result
    }

    async fn cancel_inner(&mut self) -> Result<(), TurnError> {
        if let Some(session) = self.session.take() {
            if let Err(e) = self.capture.pause().await {
                tracing::warn!(error = %e, "Failed to stop capture on cancel");
                self.session = Some(session);
                return Err(e.into());
            }
            self.capture_levels.fill(0.0);
            tracing::info!(
                session = %session.id(),
                frames = session.frame_count(),
                "Turn session cancelled"
            );
        }

        self.interrupt_playback().await;
        Ok(())
    }

    fn enqueue_inner(&mut self, pcm: Vec<i16>) -> Result<(), TurnError> {
        if pcm.is_empty() {
            return Ok(());
        }
        if self.session.as_ref().is_some_and(TurnSession::is_held) {
            tracing::debug!(samples = pcm.len(), "User holds the turn, reply chunk dropped");
            return Ok(());
        }

        let track = self.reply_track;
        self.playback.enqueue_pcm(pcm, track)?;
        self.monitor.request(track);
        Ok(())
    }

    fn accept_frame(&mut self, id: SessionId, frame: CaptureFrame) {
        let Some(session) = self.session.as_mut().filter(|s| s.id() == id) else {
            tracing::trace!(session = %id, "Frame for stale session dropped");
            return;
        };

        self.capture_levels = levels::fit_bars(&frame.amplitudes, self.config.capture.level_bars);
        session.push_frame(frame.pcm, &frame.amplitudes);
    }

    fn poll_playback(&mut self) {
        if !self.monitor.is_active() {
            return;
        }

        match self.monitor.observe(self.playback.current_offset()) {
            Some(PlaybackTransition::Started(track)) => {
                tracing::debug!(%track, "Reply playback started");
                self.bus.publish(TurnEvent::PlaybackStarted);
            }
            Some(PlaybackTransition::Ended(track)) => {
                tracing::debug!(%track, "Reply playback ended");
                self.bus.publish(TurnEvent::PlaybackEnded);
            }
            None => {}
        }

        if self.monitor.is_playing() {
            self.playback_levels = levels::fit_bars(
                &self.playback.amplitude_summary(),
                self.config.playback.level_bars,
            );
        } else {
            self.playback_levels.fill(0.0);
        }
    }

    /// Interrupt the current track with manual-stop semantics.
    async fn interrupt_playback(&mut self) {
        if self.monitor.interrupt().is_none() {
            return;
        }
        self.playback_levels.fill(0.0);

        match self.playback.interrupt().await {
            Ok(offset) => {
                tracing::debug!(samples = offset.map(|o| o.samples), "Playback interrupted");
            }
            Err(e) => tracing::warn!(error = %e, "Failed to interrupt playback"),
        }
    }

    fn frame_sink(&self, session: SessionId) -> FrameSink {
        let tx = self.cmd_tx.clone();
        Box::new(move |frame| {
            let _ = tx.send(Command::Frame { session, frame });
        })
    }

    /// Log state transitions and publish the snapshot.
    fn refresh(&mut self) {
        let new_state = self.state();
        if self.state != new_state {
            tracing::debug!(old = ?self.state, new = ?new_state, "Turn state transition");
            self.state = new_state;
        }

        let snapshot = self.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// Stop the devices and leave the bus.
    async fn release(&mut self) {
        if self.session.take().is_some()
            && let Err(e) = self.capture.pause().await
        {
            tracing::warn!(error = %e, "Failed to stop capture on shutdown");
        }
        self.interrupt_playback().await;
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        self.refresh();
    }
}

impl Drop for TurnController {
    fn drop(&mut self) {
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
    }
}
