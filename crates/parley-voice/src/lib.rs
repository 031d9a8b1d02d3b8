//! Turn-taking core for parley.
//!
//! - [`activity`]: silence detection with a single debounce timer
//! - [`monitor`]: started/ended transitions derived from playback polling
//! - [`session`]: the Turn Session owned by the controller
//! - [`controller`]: the state machine, driven directly or as a task
//! - [`handle`]: the cloneable handle used by the presentation layer
//!
//! With the `local-audio` feature (default) the crate also provides cpal
//! capture and rodio playback behind the device ports, confined to one
//! dedicated audio thread.

pub mod activity;
pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod handle;
pub mod levels;
pub mod monitor;
pub mod session;

#[cfg(feature = "local-audio")]
pub mod audio_local;
#[cfg(feature = "local-audio")]
mod audio_thread;
#[cfg(feature = "local-audio")]
pub mod capture;
#[cfg(feature = "local-audio")]
pub mod playback;

pub use activity::{ActivityDetector, ActivityEvent};
pub use config::{ActivityConfig, CaptureConfig, MonitorConfig, PlaybackConfig, TurnConfig};
pub use controller::{ControllerSnapshot, TurnController, TurnState};
pub use error::TurnError;
pub use gate::SuppressionGate;
pub use handle::ControllerHandle;
pub use monitor::{PlaybackMonitor, PlaybackPhase, PlaybackTransition};
pub use session::{CaptureOrigin, SessionId, TurnSession};
