//! Turn Session: one user utterance cycle.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::activity::ActivityDetector;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Identifies a Turn Session. Frames delivered by the capture device are
/// tagged with it so late frames from a finished session are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate the next id.
    pub fn next() -> Self {
        Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a Turn Session was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOrigin {
    /// The user pressed the control.
    Manual,
    /// Capture resumed by itself after a reply finished playing.
    AutoResume,
}

/// State owned by the controller for the session being captured.
#[derive(Debug)]
pub struct TurnSession {
    id: SessionId,
    origin: CaptureOrigin,
    frames: Vec<Vec<i16>>,
    detector: ActivityDetector,
    started_at: Instant,
}

impl TurnSession {
    /// Open a session with a freshly reset detector.
    pub fn new(origin: CaptureOrigin, mut detector: ActivityDetector, started_at: Instant) -> Self {
        detector.reset();
        Self {
            id: SessionId::next(),
            origin,
            frames: Vec::new(),
            detector,
            started_at,
        }
    }

    pub const fn id(&self) -> SessionId {
        self.id
    }

    pub const fn origin(&self) -> CaptureOrigin {
        self.origin
    }

    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Whether the user owns this session.
    ///
    /// A session is held once it was opened manually or once speech has
    /// been detected in it. Playback never cancels a held session.
    pub const fn is_held(&self) -> bool {
        matches!(self.origin, CaptureOrigin::Manual) || self.detector.has_spoken()
    }

    /// Accumulate one frame and feed its amplitudes to the detector.
    pub fn push_frame(&mut self, pcm: Vec<i16>, amplitudes: &[f32]) {
        self.detector.push_amplitudes(amplitudes);
        if !pcm.is_empty() {
            self.frames.push(pcm);
        }
    }

    pub fn detector(&self) -> &ActivityDetector {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut ActivityDetector {
        &mut self.detector
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total samples accumulated so far.
    pub fn sample_count(&self) -> usize {
        self.frames.iter().map(Vec::len).sum()
    }

    /// Merge all frames into one buffer in capture order.
    pub fn into_pcm(self) -> Vec<i16> {
        let mut pcm = Vec::with_capacity(self.sample_count());
        for frame in self.frames {
            pcm.extend(frame);
        }
        pcm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActivityConfig;

    fn session(origin: CaptureOrigin) -> TurnSession {
        TurnSession::new(
            origin,
            ActivityDetector::new(&ActivityConfig::default()),
            Instant::now(),
        )
    }

    #[test]
    fn frames_merge_in_order() {
        let mut s = session(CaptureOrigin::Manual);
        s.push_frame(vec![1, 2], &[0.5]);
        s.push_frame(vec![3], &[0.5]);
        s.push_frame(vec![4, 5, 6], &[0.5]);
        assert_eq!(s.frame_count(), 3);
        assert_eq!(s.sample_count(), 6);
        assert_eq!(s.into_pcm(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn held_by_origin_or_speech() {
        assert!(session(CaptureOrigin::Manual).is_held());

        let mut auto = session(CaptureOrigin::AutoResume);
        assert!(!auto.is_held());
        auto.push_frame(vec![0; 4], &[0.9; 4]);
        auto.detector_mut().evaluate(Instant::now());
        assert!(auto.is_held());
    }

    #[test]
    fn ids_are_distinct() {
        assert_ne!(session(CaptureOrigin::Manual).id(), session(CaptureOrigin::Manual).id());
    }
}
