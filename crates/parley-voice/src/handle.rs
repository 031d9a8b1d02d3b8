//! Cloneable handle to a running [`TurnController`](crate::TurnController).

use tokio::sync::{mpsc, oneshot, watch};

use crate::controller::{Command, ControllerSnapshot, Reply};
use crate::error::TurnError;

/// Sends commands to the controller task and observes its snapshots.
///
/// Every method fails with [`TurnError::ControllerStopped`] once the
/// controller has shut down.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<ControllerSnapshot>,
}

impl ControllerHandle {
    pub(crate) const fn new(
        tx: mpsc::UnboundedSender<Command>,
        snapshots: watch::Receiver<ControllerSnapshot>,
    ) -> Self {
        Self { tx, snapshots }
    }

    /// Open a Turn Session (interrupting playback first).
    pub async fn start_capture(&self) -> Result<(), TurnError> {
        self.request(|reply| Command::StartCapture { reply }).await
    }

    /// Submit the current Turn Session.
    pub async fn stop_and_send(&self) -> Result<(), TurnError> {
        self.request(|reply| Command::StopAndSend { reply }).await
    }

    /// Cancel the current Turn Session and interrupt playback.
    pub async fn cancel(&self) -> Result<(), TurnError> {
        self.request(|reply| Command::Cancel { reply }).await
    }

    /// Enable or disable hands-free continuation.
    pub fn set_auto_resume(&self, enabled: bool) -> Result<(), TurnError> {
        self.send(Command::SetAutoResume(enabled))
    }

    /// Hand one chunk of inbound reply audio to the controller.
    pub fn deliver_reply_audio(&self, pcm: Vec<i16>) -> Result<(), TurnError> {
        self.send(Command::ReplyAudio(pcm))
    }

    /// Ask the controller to release its devices and stop.
    pub fn shutdown(&self) -> Result<(), TurnError> {
        self.send(Command::Shutdown)
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified whenever the snapshot changes.
    #[must_use]
    pub fn watch_snapshots(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshots.clone()
    }

    /// Whether the controller task is still accepting commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, cmd: Command) -> Result<(), TurnError> {
        self.tx.send(cmd).map_err(|_| TurnError::ControllerStopped)
    }

    async fn request(&self, make: impl FnOnce(Reply) -> Command) -> Result<(), TurnError> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply))?;
        rx.await.map_err(|_| TurnError::ControllerStopped)?
    }
}

impl std::fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerHandle")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
