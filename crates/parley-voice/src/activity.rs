//! Silence detection for one Turn Session.
//!
//! Amplitude samples are pushed as frames arrive; [`ActivityDetector::evaluate`]
//! runs once per tick on everything pushed since the previous tick. The
//! window mean is compared against the threshold:
//!
//! - speech latches `has_spoken` and cancels a running silence timer
//! - silence after speech starts the timer (at most one per session)
//! - the timer firing while still silent signals the end of the utterance,
//!   exactly once
//!
//! Silence is never timed before the first speech, so dead air at the start
//! of a session cannot end the turn.

use std::time::{Duration, Instant};

use crate::config::ActivityConfig;
use crate::levels;

/// Transition reported by one evaluation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    /// First window at or above the threshold in this session.
    SpeechStarted,

    /// Silence after speech; the debounce timer is now running.
    SilenceTimerStarted,

    /// Speech resumed before the timer fired.
    SilenceTimerCancelled,

    /// The debounce window elapsed in silence. Reported once per session.
    UtteranceComplete,
}

/// Speech/silence classifier with a single debounce timer.
#[derive(Debug, Clone)]
pub struct ActivityDetector {
    threshold: f32,
    silence_duration: Duration,

    /// Amplitudes pushed since the last evaluation.
    window: Vec<f32>,

    /// Latched on first speech.
    has_spoken: bool,

    /// When the current silence began, while the timer runs.
    silence_started_at: Option<Instant>,

    /// Classification of the most recent non-empty window.
    last_silent: bool,

    /// `UtteranceComplete` has been reported.
    fired: bool,
}

impl ActivityDetector {
    /// Create a detector with threshold θ and debounce window D.
    pub fn new(config: &ActivityConfig) -> Self {
        Self {
            threshold: config.threshold,
            silence_duration: config.silence_duration(),
            window: Vec::new(),
            has_spoken: false,
            silence_started_at: None,
            last_silent: true,
            fired: false,
        }
    }

    /// Append amplitude samples to the current window.
    pub fn push_amplitudes(&mut self, amplitudes: &[f32]) {
        self.window.extend_from_slice(amplitudes);
    }

    /// Classify the window accumulated since the last call, then check the
    /// timer.
    ///
    /// An empty window keeps the previous classification; only the timer
    /// is evaluated.
    pub fn evaluate(&mut self, now: Instant) -> Option<ActivityEvent> {
        if self.fired {
            self.window.clear();
            return None;
        }

        if let Some(mean) = levels::mean(&self.window) {
            self.window.clear();
            let silent = mean < self.threshold;
            self.last_silent = silent;

            if !silent {
                if !self.has_spoken {
                    self.has_spoken = true;
                    tracing::debug!(level = mean, "Speech detected");
                    return Some(ActivityEvent::SpeechStarted);
                }
                if self.silence_started_at.take().is_some() {
                    tracing::trace!(level = mean, "Speech resumed, silence timer cancelled");
                    return Some(ActivityEvent::SilenceTimerCancelled);
                }
                return None;
            }

            if self.has_spoken && self.silence_started_at.is_none() {
                self.silence_started_at = Some(now);
                tracing::trace!(
                    timeout_ms = self.silence_duration.as_millis(),
                    "Silence after speech, timer started"
                );
                return Some(ActivityEvent::SilenceTimerStarted);
            }
        }

        let started = self.silence_started_at?;
        if self.last_silent && now.saturating_duration_since(started) >= self.silence_duration {
            self.silence_started_at = None;
            self.fired = true;
            tracing::debug!("Silence timeout elapsed, utterance complete");
            return Some(ActivityEvent::UtteranceComplete);
        }

        None
    }

    /// Forget latched speech, the timer and any buffered samples.
    pub fn reset(&mut self) {
        self.window.clear();
        self.has_spoken = false;
        self.silence_started_at = None;
        self.last_silent = true;
        self.fired = false;
    }

    /// Whether speech has been observed since the last reset.
    #[must_use]
    pub const fn has_spoken(&self) -> bool {
        self.has_spoken
    }

    /// Whether the silence timer is running.
    #[must_use]
    pub const fn timer_running(&self) -> bool {
        self.silence_started_at.is_some()
    }

    /// When the current silence began, if the timer is running.
    #[must_use]
    pub const fn silence_started_at(&self) -> Option<Instant> {
        self.silence_started_at
    }
}
