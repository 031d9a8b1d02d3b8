//! Loopback agent channel for demos without a network.
//!
//! [`EchoChannel`] treats every submitted utterance as the agent's reply:
//! after a short delay the same audio is handed back in playback-sized
//! chunks, so a full turn (capture, submit, playback, auto-resume) runs
//! with nothing but a microphone and a speaker.

use std::time::Duration;

use async_trait::async_trait;
use parley_core::{AgentChannel, PortError, Utterance};
use parley_voice::ControllerHandle;
use tokio::sync::mpsc;

/// Reply chunk length (100 ms at 24 kHz).
const REPLY_CHUNK: usize = 2400;

/// Agent channel that plays every utterance back.
pub struct EchoChannel {
    replies: mpsc::UnboundedSender<Vec<i16>>,
    delay: Duration,
    playback_rate: u32,
}

impl EchoChannel {
    /// Create the channel and the receiver its replies arrive on.
    pub fn new(delay: Duration, playback_rate: u32) -> (Self, mpsc::UnboundedReceiver<Vec<i16>>) {
        let (replies, rx) = mpsc::unbounded_channel();
        let channel = Self {
            replies,
            delay,
            playback_rate,
        };
        (channel, rx)
    }
}

#[async_trait]
impl AgentChannel for EchoChannel {
    fn is_ready(&self) -> bool {
        !self.replies.is_closed()
    }

    async fn send_audio(&self, utterance: Utterance) -> Result<(), PortError> {
        if self.replies.is_closed() {
            return Err(PortError::Channel("echo receiver dropped".to_string()));
        }

        tracing::info!(
            track = %utterance.track,
            samples = utterance.pcm.len(),
            duration_ms = utterance.duration_ms(),
            "Echoing utterance"
        );

        let pcm = resample_nearest(&utterance.pcm, utterance.sample_rate, self.playback_rate);
        let replies = self.replies.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            for chunk in pcm.chunks(REPLY_CHUNK) {
                if replies.send(chunk.to_vec()).is_err() {
                    break;
                }
            }
        });
        Ok(())
    }
}

/// Feed echoed replies into the controller until either side closes.
pub async fn forward_replies(mut rx: mpsc::UnboundedReceiver<Vec<i16>>, handle: ControllerHandle) {
    while let Some(pcm) = rx.recv().await {
        if handle.deliver_reply_audio(pcm).is_err() {
            break;
        }
    }
    tracing::debug!("Echo forwarder finished");
}

/// Nearest-sample rate conversion; good enough for a loopback demo.
#[allow(clippy::cast_possible_truncation)]
fn resample_nearest(pcm: &[i16], from: u32, to: u32) -> Vec<i16> {
    if from == to || from == 0 || pcm.is_empty() {
        return pcm.to_vec();
    }
    let out_len = (pcm.len() as u64 * u64::from(to) / u64::from(from)) as usize;
    (0..out_len)
        .map(|i| {
            let src = (i as u64 * u64::from(from) / u64::from(to)) as usize;
            pcm[src.min(pcm.len() - 1)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use parley_core::{SubmitReason, TrackId};

    use super::*;

    fn utterance(pcm: Vec<i16>, sample_rate: u32) -> Utterance {
        Utterance {
            track: TrackId::new(),
            pcm,
            sample_rate,
            reason: SubmitReason::Silence,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_echo_arrives_after_delay_in_chunks() {
        let (channel, mut rx) = EchoChannel::new(Duration::from_millis(600), 24_000);
        let pcm: Vec<i16> = (0..5000).map(|i| (i % 100) as i16).collect();

        channel.send_audio(utterance(pcm.clone(), 24_000)).await.unwrap();
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(650)).await;
        let mut echoed = Vec::new();
        let mut chunks = 0;
        while let Ok(chunk) = rx.try_recv() {
            assert!(chunk.len() <= REPLY_CHUNK);
            echoed.extend(chunk);
            chunks += 1;
        }
        assert_eq!(chunks, 3);
        assert_eq!(echoed, pcm);
    }

    #[tokio::test]
    async fn test_not_ready_once_receiver_dropped() {
        let (channel, rx) = EchoChannel::new(Duration::ZERO, 24_000);
        assert!(channel.is_ready());

        drop(rx);
        assert!(!channel.is_ready());
        let err = channel.send_audio(utterance(vec![1; 10], 24_000)).await;
        assert!(matches!(err, Err(PortError::Channel(_))));
    }

    #[test]
    fn test_resample_nearest() {
        assert_eq!(resample_nearest(&[1, 2, 3], 24_000, 24_000), vec![1, 2, 3]);
        assert_eq!(resample_nearest(&[1, 2, 3, 4], 16_000, 8_000), vec![1, 3]);
        assert_eq!(resample_nearest(&[1, 2], 8_000, 16_000), vec![1, 1, 2, 2]);
    }

    #[test]
    fn test_resample_nearest_uneven_ratio() {
        // Output length rounds down and every index stays in range.
        assert_eq!(resample_nearest(&[1, 2, 3], 24_000, 16_000), vec![1, 2]);
        assert_eq!(resample_nearest(&[5], 44_100, 24_000), Vec::<i16>::new());
        assert_eq!(resample_nearest(&[1, 2, 3], 24_000, 0), Vec::<i16>::new());
        assert_eq!(resample_nearest(&[7; 441], 44_100, 24_000).len(), 240);
    }
}
