//! Format-only rendering of the mic control.
//!
//! Everything here is a pure function of a [`ControllerSnapshot`]; the
//! terminal loop decides when to draw.

use parley_voice::{ControllerSnapshot, TurnState};

/// Eight bar heights plus blank, lowest first.
const BAR_GLYPHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Glyph for a level in [0, 1]; out-of-range levels are clamped.
pub fn bar_glyph(level: f32) -> char {
    let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = (level * 8.0).round() as usize;
    BAR_GLYPHS[index.min(BAR_GLYPHS.len() - 1)]
}

/// One glyph per level.
pub fn render_bars(levels: &[f32]) -> String {
    levels.iter().copied().map(bar_glyph).collect()
}

/// Short indicator shown on the mic button.
pub fn indicator(snapshot: &ControllerSnapshot) -> &'static str {
    if !snapshot.ready {
        return "[ -- ]";
    }
    match snapshot.state {
        TurnState::Idle => "[ MIC ]",
        TurnState::Capturing => "[ REC ]",
        TurnState::Suppressed => "[ ))) ]",
    }
}

/// What the controller is doing, in words.
pub fn status_label(snapshot: &ControllerSnapshot) -> &'static str {
    if !snapshot.ready {
        return "microphone unavailable";
    }
    match snapshot.state {
        TurnState::Idle => "ready",
        TurnState::Capturing if snapshot.has_spoken => "listening",
        TurnState::Capturing => "waiting for speech",
        TurnState::Suppressed => "agent speaking",
    }
}

/// Keys that do something in the current state.
pub fn key_hints(snapshot: &ControllerSnapshot) -> &'static str {
    if !snapshot.ready {
        return "q quit";
    }
    match snapshot.state {
        TurnState::Idle => "space talk | a auto-resume | q quit",
        TurnState::Capturing => "space send | esc cancel | a auto-resume | q quit",
        TurnState::Suppressed => "space talk over | esc stop reply | a auto-resume | q quit",
    }
}

/// The full single-line mic control.
///
/// Capture levels are shown while recording and playback levels while the
/// agent speaks; `notice` carries the last gesture error, if any.
pub fn render_mic_control(snapshot: &ControllerSnapshot, notice: Option<&str>) -> String {
    let levels: &[f32] = match snapshot.state {
        TurnState::Capturing => &snapshot.capture_levels,
        TurnState::Suppressed => &snapshot.playback_levels,
        TurnState::Idle => &[],
    };
    let auto = if snapshot.auto_resume { "on" } else { "off" };

    let mut line = format!(
        "{} {:<22} {:<30}  auto-resume {auto}  ({})",
        indicator(snapshot),
        status_label(snapshot),
        render_bars(levels),
        key_hints(snapshot),
    );
    if let Some(notice) = notice {
        line.push_str("  ! ");
        line.push_str(notice);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(state: TurnState) -> ControllerSnapshot {
        ControllerSnapshot {
            state,
            ready: true,
            auto_resume: true,
            ..ControllerSnapshot::default()
        }
    }

    #[test]
    fn test_bar_glyph_bounds() {
        assert_eq!(bar_glyph(0.0), ' ');
        assert_eq!(bar_glyph(1.0), '█');
        assert_eq!(bar_glyph(7.5), '█');
        assert_eq!(bar_glyph(-1.0), ' ');
        assert_eq!(bar_glyph(f32::NAN), ' ');
        assert_eq!(bar_glyph(0.5), '▄');
    }

    #[test]
    fn test_not_ready_renders_disabled() {
        let mut s = snapshot(TurnState::Idle);
        s.ready = false;
        let line = render_mic_control(&s, None);
        assert!(line.starts_with("[ -- ]"));
        assert!(line.contains("microphone unavailable"));
        assert!(!line.contains("space"));
    }

    #[test]
    fn test_capturing_shows_capture_levels() {
        let mut s = snapshot(TurnState::Capturing);
        s.capture_levels = vec![1.0, 0.0, 1.0];
        s.playback_levels = vec![0.5; 5];
        let line = render_mic_control(&s, None);
        assert!(line.starts_with("[ REC ] waiting for speech"));
        assert!(line.contains("█ █"));
        assert!(!line.contains('▄'));

        s.has_spoken = true;
        assert!(render_mic_control(&s, None).contains("listening"));
    }

    #[test]
    fn test_suppressed_shows_playback_levels() {
        let mut s = snapshot(TurnState::Suppressed);
        s.playback_levels = vec![0.5; 5];
        let line = render_mic_control(&s, None);
        assert!(line.contains("agent speaking"));
        assert!(line.contains("▄▄▄▄▄"));
        assert!(line.contains("esc stop reply"));
    }

    #[test]
    fn test_auto_resume_and_notice() {
        let mut s = snapshot(TurnState::Idle);
        s.auto_resume = false;
        let line = render_mic_control(&s, Some("No active recording"));
        assert!(line.contains("auto-resume off"));
        assert!(line.ends_with("! No active recording"));
    }
}
