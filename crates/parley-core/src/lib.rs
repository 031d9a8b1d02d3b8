//! Core domain types, typed event bus and port definitions for parley.
//!
//! This crate has no audio-device dependencies. It defines:
//!
//! - [`events`]: the closed set of turn-taking topics
//! - [`bus`]: the publish/subscribe registry carrying those topics
//! - [`audio`]: PCM frames, tracks and utterances
//! - [`ports`]: traits for the capture device, playback device and agent channel

pub mod audio;
pub mod bus;
pub mod events;
pub mod ports;

pub use audio::{
    CaptureFormat, CaptureFrame, PlaybackFormat, SubmitReason, TrackId, TrackOffset, Utterance,
};
pub use bus::{EventBus, EventHandler, Subscription};
pub use events::TurnEvent;
pub use ports::{AgentChannel, CaptureDevice, FrameSink, PlaybackDevice, PortError};
