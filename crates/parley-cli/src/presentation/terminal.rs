//! The interactive terminal loop.

use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveToColumn, Show};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{execute, queue, style::Print};
use parley_voice::ControllerHandle;
use tokio::sync::mpsc;

use super::input::{self, Gesture};
use super::render::render_mic_control;
use crate::error::CliError;

/// Raw mode for the lifetime of the guard.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), Hide)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, Print("\r\n"));
        let _ = terminal::disable_raw_mode();
    }
}

fn draw(out: &mut impl Write, line: &str) -> io::Result<()> {
    queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine), Print(line))?;
    out.flush()
}

/// Render snapshots and forward key gestures until the user quits or the
/// controller stops.
pub async fn run(handle: ControllerHandle) -> Result<(), CliError> {
    let _raw = RawModeGuard::enable()?;
    let (tx, mut gestures) = mpsc::unbounded_channel::<Gesture>();
    let _reader = input::spawn_key_reader(tx)?;

    let mut snapshots = handle.watch_snapshots();
    let mut notice: Option<String> = None;
    let mut out = io::stdout();

    let snapshot = snapshots.borrow_and_update().clone();
    draw(&mut out, &render_mic_control(&snapshot, None))?;

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            gesture = gestures.recv() => {
                let Some(gesture) = gesture else { break };
                let current = handle.snapshot();
                match input::apply(gesture, &handle, &current).await {
                    Ok(true) => notice = None,
                    Ok(false) => break,
                    Err(e) => {
                        tracing::debug!(?gesture, error = %e, "Gesture rejected");
                        notice = Some(e.to_string());
                    }
                }
            }
        }

        let snapshot = snapshots.borrow_and_update().clone();
        draw(&mut out, &render_mic_control(&snapshot, notice.as_deref()))?;
    }

    Ok(())
}
