//! Terminal client for parley: a keyboard-driven mic control over the
//! turn-taking controller, with a loopback echo agent.

pub mod channel;
pub mod config;
pub mod error;
pub mod logging;
pub mod parser;
pub mod presentation;

pub use channel::{EchoChannel, forward_replies};
pub use error::CliError;
pub use parser::Cli;
