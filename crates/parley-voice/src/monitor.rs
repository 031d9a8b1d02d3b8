//! Playback monitor: derives started/ended transitions from offset polling.
//!
//! The playback device never announces that a track finished. The monitor
//! is told when audio is requested, then fed the device's current offset on
//! every tick and turns the sequence of observations into transitions.
//!
//! ```text
//!            request(T)            offset(T)             none
//!   Idle ──────────────▶ Requested ─────────▶ Playing ─────────▶ Idle
//!    ▲                      │ none × grace       │ interrupt()
//!    └──────────────────────┴────────────────────┘
//! ```
//!
//! `Ended` is reported at most once per play request: the
//! `ended_announced` flag is only cleared by the next [`PlaybackMonitor::request`].

use parley_core::{TrackId, TrackOffset};

/// Where the monitor believes the current track is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Nothing requested.
    Idle,

    /// Audio was enqueued but no position has been observed yet.
    Requested {
        /// Track the audio was enqueued on.
        track: TrackId,
        /// Consecutive polls that saw no position.
        empty_polls: u32,
    },

    /// The device reported an advancing position for the track.
    Playing {
        /// Track being played.
        track: TrackId,
    },
}

/// Transition derived from one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackTransition {
    /// The first position for the requested track was observed.
    Started(TrackId),

    /// The track ran out of audio, or never produced any.
    Ended(TrackId),
}

/// Polling-based playback state tracker.
#[derive(Debug, Clone)]
pub struct PlaybackMonitor {
    phase: PlaybackPhase,
    ended_announced: bool,
    stopped_manually: bool,
    start_grace_ticks: u32,
}

impl PlaybackMonitor {
    /// Create an idle monitor.
    ///
    /// A requested track that reports no position for more than
    /// `start_grace_ticks` consecutive polls is abandoned and reported as
    /// `Ended`.
    pub const fn new(start_grace_ticks: u32) -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            ended_announced: false,
            stopped_manually: false,
            start_grace_ticks,
        }
    }

    /// Record that audio was enqueued on `track`.
    ///
    /// More audio for the track already being tracked changes nothing.
    /// Anything else begins a new Playback Session and clears both the
    /// announcement and manual-stop flags.
    pub fn request(&mut self, track: TrackId) {
        match self.phase {
            PlaybackPhase::Playing { track: current } if current == track => {}
            PlaybackPhase::Requested { track: current, .. } if current == track => {
                self.phase = PlaybackPhase::Requested {
                    track,
                    empty_polls: 0,
                };
            }
            _ => {
                self.phase = PlaybackPhase::Requested {
                    track,
                    empty_polls: 0,
                };
                self.ended_announced = false;
                self.stopped_manually = false;
                tracing::debug!(%track, "Playback requested");
            }
        }
    }

    /// Feed one poll of the device's current offset.
    pub fn observe(&mut self, offset: Option<TrackOffset>) -> Option<PlaybackTransition> {
        match self.phase {
            PlaybackPhase::Idle => None,

            PlaybackPhase::Requested { track, empty_polls } => {
                if offset.is_some_and(|o| o.track == track) {
                    self.phase = PlaybackPhase::Playing { track };
                    tracing::debug!(%track, "Playback started");
                    return Some(PlaybackTransition::Started(track));
                }

                let empty_polls = empty_polls.saturating_add(1);
                if empty_polls <= self.start_grace_ticks {
                    self.phase = PlaybackPhase::Requested { track, empty_polls };
                    return None;
                }

                // Abandoned before any position: the play request is over.
                self.phase = PlaybackPhase::Idle;
                tracing::debug!(%track, "Requested track never started, abandoning");
                self.announce_end(track)
            }

            PlaybackPhase::Playing { track } => {
                if offset.is_some_and(|o| o.track == track) {
                    return None;
                }

                self.phase = PlaybackPhase::Idle;
                self.announce_end(track)
            }
        }
    }

    fn announce_end(&mut self, track: TrackId) -> Option<PlaybackTransition> {
        if self.ended_announced {
            return None;
        }
        self.ended_announced = true;
        tracing::debug!(%track, "Playback ended");
        Some(PlaybackTransition::Ended(track))
    }

    /// Mark the current session as manually stopped and go idle at once.
    ///
    /// Returns the interrupted track, if any. No `Ended` is reported for it.
    pub fn interrupt(&mut self) -> Option<TrackId> {
        let track = self.track()?;
        self.stopped_manually = true;
        self.phase = PlaybackPhase::Idle;
        tracing::debug!(%track, "Playback interrupted");
        Some(track)
    }

    /// Whether a track is requested or playing.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.phase, PlaybackPhase::Idle)
    }

    /// Whether the device has reported a position for the current track.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self.phase, PlaybackPhase::Playing { .. })
    }

    /// Track currently requested or playing.
    #[must_use]
    pub const fn track(&self) -> Option<TrackId> {
        match self.phase {
            PlaybackPhase::Idle => None,
            PlaybackPhase::Requested { track, .. } | PlaybackPhase::Playing { track } => {
                Some(track)
            }
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    /// Whether the last session was stopped by [`interrupt`](Self::interrupt).
    #[must_use]
    pub const fn stopped_manually(&self) -> bool {
        self.stopped_manually
    }

    /// Whether `Ended` has been reported since the last request.
    #[must_use]
    pub const fn ended_announced(&self) -> bool {
        self.ended_announced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(track: TrackId, samples: u64) -> Option<TrackOffset> {
        Some(TrackOffset { track, samples })
    }

    #[test]
    fn started_then_ended_once() {
        let mut monitor = PlaybackMonitor::new(10);
        let t1 = TrackId::new();
        monitor.request(t1);
        assert!(monitor.is_active());
        assert!(!monitor.is_playing());

        assert_eq!(monitor.observe(at(t1, 0)), Some(PlaybackTransition::Started(t1)));
        for samples in 1..20 {
            assert_eq!(monitor.observe(at(t1, samples * 480)), None);
        }

        let ended: Vec<_> = (0..10).filter_map(|_| monitor.observe(None)).collect();
        assert_eq!(ended, vec![PlaybackTransition::Ended(t1)]);
        assert!(monitor.ended_announced());
        assert!(!monitor.is_active());
    }

    #[test]
    fn appended_chunks_keep_session() {
        let mut monitor = PlaybackMonitor::new(10);
        let t1 = TrackId::new();
        monitor.request(t1);
        monitor.observe(at(t1, 0));
        monitor.request(t1);
        assert!(monitor.is_playing());
        assert_eq!(monitor.observe(at(t1, 100)), None);
    }

    #[test]
    fn interrupt_suppresses_ended() {
        let mut monitor = PlaybackMonitor::new(10);
        let t1 = TrackId::new();
        monitor.request(t1);
        monitor.observe(at(t1, 0));

        assert_eq!(monitor.interrupt(), Some(t1));
        assert!(monitor.stopped_manually());
        assert!(!monitor.is_active());
        assert_eq!(monitor.observe(None), None);
        assert_eq!(monitor.interrupt(), None);
    }

    #[test]
    fn new_request_clears_flags() {
        let mut monitor = PlaybackMonitor::new(10);
        let t1 = TrackId::new();
        monitor.request(t1);
        monitor.observe(at(t1, 0));
        monitor.interrupt();

        let t2 = TrackId::new();
        monitor.request(t2);
        assert!(!monitor.stopped_manually());
        assert!(!monitor.ended_announced());
        monitor.observe(at(t2, 0));
        assert_eq!(monitor.observe(None), Some(PlaybackTransition::Ended(t2)));
    }

    #[test]
    fn stale_track_offset_ends_session() {
        let mut monitor = PlaybackMonitor::new(10);
        let t1 = TrackId::new();
        let stale = TrackId::new();
        monitor.request(t1);
        monitor.observe(at(t1, 0));
        assert_eq!(monitor.observe(at(stale, 5)), Some(PlaybackTransition::Ended(t1)));
    }

    #[test]
    fn track_that_never_starts_ends_after_grace() {
        let mut monitor = PlaybackMonitor::new(3);
        let t1 = TrackId::new();
        monitor.request(t1);
        for _ in 0..3 {
            assert_eq!(monitor.observe(None), None);
            assert!(monitor.is_active());
        }
        assert_eq!(monitor.observe(None), Some(PlaybackTransition::Ended(t1)));
        assert!(!monitor.is_active());
        assert!(monitor.ended_announced());
        assert!(!monitor.stopped_manually());
        assert_eq!(monitor.observe(None), None);
    }

    #[test]
    fn interrupt_before_first_position_goes_idle() {
        let mut monitor = PlaybackMonitor::new(3);
        let t1 = TrackId::new();
        monitor.request(t1);
        assert_eq!(monitor.interrupt(), Some(t1));
        assert_eq!(monitor.phase(), PlaybackPhase::Idle);
        assert_eq!(monitor.observe(at(t1, 0)), None);
    }
}
