//! Controller configuration.
//!
//! Every section derives `Default` and is `#[serde(default)]`, so a config
//! file only needs the keys it overrides.

use std::time::Duration;

use parley_core::{CaptureFormat, PlaybackFormat};
use serde::{Deserialize, Serialize};

use crate::error::TurnError;

/// Silence detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Mean amplitude below which a window counts as silence (default 0.2).
    pub threshold: f32,

    /// Continuous silence after speech that ends the turn (ms, default 1500).
    pub silence_duration_ms: u64,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            silence_duration_ms: 1500,
        }
    }
}

impl ActivityConfig {
    /// The debounce window as a `Duration`.
    pub const fn silence_duration(&self) -> Duration {
        Duration::from_millis(self.silence_duration_ms)
    }
}

/// Playback polling parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Tick cadence (ms, default 16, one animation frame at 60 Hz).
    pub poll_interval_ms: u64,

    /// How long a requested track may report no position before it is
    /// considered never started (ms, default 500).
    pub start_grace_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 16,
            start_grace_ms: 500,
        }
    }
}

impl MonitorConfig {
    /// The tick cadence as a `Duration`.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Number of consecutive empty polls tolerated for a requested track.
    pub const fn start_grace_ticks(&self) -> u32 {
        if self.poll_interval_ms == 0 {
            return 0;
        }
        let ticks = self.start_grace_ms.div_ceil(self.poll_interval_ms);
        if ticks > u32::MAX as u64 {
            u32::MAX
        } else {
            #[allow(clippy::cast_possible_truncation)]
            {
                ticks as u32
            }
        }
    }
}

/// Microphone capture parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// PCM16 mono rate of captured frames (default 24 kHz).
    pub sample_rate: u32,

    /// Samples per pushed frame (default 1024).
    pub frame_size: usize,

    /// Bars in the capture visualisation (default 30).
    pub level_bars: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let format = CaptureFormat::default();
        Self {
            sample_rate: format.sample_rate,
            frame_size: format.frame_size,
            level_bars: format.bands,
        }
    }
}

impl CaptureConfig {
    /// The format handed to the capture device.
    pub const fn format(&self) -> CaptureFormat {
        CaptureFormat {
            sample_rate: self.sample_rate,
            frame_size: self.frame_size,
            bands: self.level_bars,
        }
    }
}

/// Reply playback parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// PCM16 mono rate of reply audio (default 24 kHz).
    pub sample_rate: u32,

    /// Bars in the playback visualisation (default 5).
    pub level_bars: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: PlaybackFormat::default().sample_rate,
            level_bars: 5,
        }
    }
}

impl PlaybackConfig {
    /// The format handed to the playback device.
    pub const fn format(&self) -> PlaybackFormat {
        PlaybackFormat {
            sample_rate: self.sample_rate,
        }
    }
}

/// Configuration for the turn-taking controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Silence detection.
    pub activity: ActivityConfig,

    /// Playback polling.
    pub monitor: MonitorConfig,

    /// Microphone capture.
    pub capture: CaptureConfig,

    /// Reply playback.
    pub playback: PlaybackConfig,

    /// Whether capture resumes by itself after a reply finishes playing.
    pub auto_resume: bool,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            activity: ActivityConfig::default(),
            monitor: MonitorConfig::default(),
            capture: CaptureConfig::default(),
            playback: PlaybackConfig::default(),
            auto_resume: true,
        }
    }
}

impl TurnConfig {
    /// Reject values the controller cannot run with.
    pub fn validate(&self) -> Result<(), TurnError> {
        let threshold = self.activity.threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(TurnError::InvalidConfig(format!(
                "activity.threshold must be in (0, 1], got {threshold}"
            )));
        }
        if self.activity.silence_duration_ms == 0 {
            return Err(TurnError::InvalidConfig(
                "activity.silence_duration_ms must be positive".to_string(),
            ));
        }
        if self.monitor.poll_interval_ms == 0 {
            return Err(TurnError::InvalidConfig(
                "monitor.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.capture.sample_rate == 0 || self.playback.sample_rate == 0 {
            return Err(TurnError::InvalidConfig(
                "sample rates must be positive".to_string(),
            ));
        }
        if self.capture.frame_size == 0 {
            return Err(TurnError::InvalidConfig(
                "capture.frame_size must be positive".to_string(),
            ));
        }
        if self.capture.level_bars == 0 || self.playback.level_bars == 0 {
            return Err(TurnError::InvalidConfig(
                "level_bars must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
