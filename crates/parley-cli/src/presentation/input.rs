//! Key gestures and their controller actions.

use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use parley_voice::{ControllerHandle, ControllerSnapshot, TurnError};
use tokio::sync::mpsc;

/// How often the key reader checks whether the UI went away.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A user intent decoded from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Space: start a recording, or send the current one.
    Toggle,
    /// Escape: cancel the recording and stop any reply.
    Cancel,
    /// `a`: flip hands-free continuation.
    ToggleAutoResume,
    /// `q` or Ctrl-C.
    Quit,
}

/// Decode a key event. Releases and repeats are ignored.
pub fn gesture_for_key(key: &KeyEvent) -> Option<Gesture> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char(' ') => Some(Gesture::Toggle),
        KeyCode::Esc => Some(Gesture::Cancel),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Gesture::Quit),
        KeyCode::Char('a' | 'A') => Some(Gesture::ToggleAutoResume),
        KeyCode::Char('q' | 'Q') => Some(Gesture::Quit),
        _ => None,
    }
}

/// Forward a gesture to the controller.
///
/// Returns `Ok(false)` when the UI should exit.
pub async fn apply(
    gesture: Gesture,
    handle: &ControllerHandle,
    snapshot: &ControllerSnapshot,
) -> Result<bool, TurnError> {
    match gesture {
        Gesture::Toggle if snapshot.is_capturing() => handle.stop_and_send().await?,
        Gesture::Toggle => handle.start_capture().await?,
        Gesture::Cancel => handle.cancel().await?,
        Gesture::ToggleAutoResume => handle.set_auto_resume(!snapshot.auto_resume)?,
        Gesture::Quit => {
            handle.shutdown()?;
            return Ok(false);
        }
    }
    Ok(true)
}

/// Read terminal keys on a blocking thread and send decoded gestures.
///
/// The thread exits when the receiver is dropped or input fails.
pub fn spawn_key_reader(gestures: mpsc::UnboundedSender<Gesture>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("parley-keys".to_string())
        .spawn(move || {
            loop {
                if gestures.is_closed() {
                    break;
                }
                match event::poll(POLL_INTERVAL) {
                    Ok(false) => {}
                    Ok(true) => match event::read() {
                        Ok(Event::Key(key)) => {
                            if let Some(gesture) = gesture_for_key(&key)
                                && gestures.send(gesture).is_err()
                            {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "Key read failed");
                            break;
                        }
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "Key poll failed");
                        break;
                    }
                }
            }
            tracing::debug!("Key reader stopped");
        })
}
