//! Suppression gate shared by the local capture and playback devices.
//!
//! The controller already refuses to open a Turn Session while a reply is
//! playing. The gate adds the device-level half of that rule: while the
//! speaker is being fed, the capture stream throws microphone input away so
//! the agent never hears its own voice leaking back through the room.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag raised while the playback device is producing sound.
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct SuppressionGate {
    playing: Arc<AtomicBool>,
}

impl SuppressionGate {
    /// Create a new, open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the gate: playback has started.
    pub fn suppress(&self) {
        if !self.playing.swap(true, Ordering::SeqCst) {
            tracing::debug!("Suppression gate closed, mic input dropped");
        }
    }

    /// Open the gate: playback has stopped or run out.
    pub fn release(&self) {
        if self.playing.swap(false, Ordering::SeqCst) {
            tracing::debug!("Suppression gate open, mic input accepted");
        }
    }

    /// Whether microphone input should currently be discarded.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_starts_open() {
        assert!(!SuppressionGate::new().is_suppressed());
    }

    #[test]
    fn suppress_and_release() {
        let gate = SuppressionGate::new();
        gate.suppress();
        gate.suppress();
        assert!(gate.is_suppressed());
        gate.release();
        assert!(!gate.is_suppressed());
    }

    #[test]
    fn clones_share_state() {
        let a = SuppressionGate::new();
        let b = a.clone();
        a.suppress();
        assert!(b.is_suppressed());
        b.release();
        assert!(!a.is_suppressed());
    }
}
