//! Outbound side of the network channel to the remote agent.
//!
//! The inbound side (reply audio) is pushed into the controller by whoever
//! owns the channel, via `ControllerHandle::deliver_reply_audio`.

use async_trait::async_trait;

use super::PortError;
use crate::audio::Utterance;

/// Sends completed user utterances to the remote agent.
#[async_trait]
pub trait AgentChannel: Send + Sync {
    /// Whether the channel is connected and can accept audio.
    fn is_ready(&self) -> bool;

    /// Transmit one merged utterance.
    async fn send_audio(&self, utterance: Utterance) -> Result<(), PortError>;
}
