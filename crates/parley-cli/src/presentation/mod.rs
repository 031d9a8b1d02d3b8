//! The terminal mic control.
//!
//! # Guidelines
//!
//! - [`render`] is format-only: snapshot in, string out
//! - [`input`] maps keys to gestures and gestures to controller calls
//! - [`terminal`] owns raw mode and the draw loop

pub mod input;
pub mod render;
pub mod terminal;

pub use input::{Gesture, apply, gesture_for_key};
pub use render::render_mic_control;
pub use terminal::run;
