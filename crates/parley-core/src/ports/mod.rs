//! Port definitions for the external collaborators of the controller.
//!
//! # Design Rules
//!
//! - Ports describe *what* the controller needs from a device or channel,
//!   never how a backend provides it.
//! - No device crate (cpal, rodio) is visible here; adapters live in
//!   `parley-voice` or in the binary.

mod channel;
mod devices;
mod error;

pub use channel::AgentChannel;
pub use devices::{CaptureDevice, FrameSink, PlaybackDevice};
pub use error::PortError;
