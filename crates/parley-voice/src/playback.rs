//! Reply playback via `rodio`.
//!
//! Every track gets its own [`Sink`]; chunks for the same track are
//! appended to it, a chunk for another track stops the old sink first.
//! The position inside the track is derived from the number of chunks the
//! sink has finished plus the position inside the current chunk, because
//! rodio has no notion of a multi-chunk track.

use std::time::Duration;

use parley_core::{PlaybackFormat, PortError, TrackId, TrackOffset};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::gate::SuppressionGate;
use crate::levels;

/// Samples summarised by [`AudioPlayback::amplitude_summary`].
const SUMMARY_WINDOW: usize = 2048;

/// Bands returned by [`AudioPlayback::amplitude_summary`].
const SUMMARY_BANDS: usize = 16;

/// Bookkeeping for the track being played.
struct Track {
    id: TrackId,
    sink: Sink,
    /// Length of every chunk appended, in order.
    chunks: Vec<usize>,
    /// All samples of the track, for the amplitude summary.
    samples: Vec<i16>,
}

impl Track {
    /// Samples played so far.
    fn position(&self, sample_rate: u32) -> u64 {
        let finished = self.chunks.len().saturating_sub(self.sink.len());
        let before: usize = self.chunks[..finished].iter().sum();
        let within = duration_to_samples(self.sink.get_pos(), sample_rate);
        let current = self.chunks.get(finished).copied().unwrap_or(0) as u64;
        before as u64 + within.min(current)
    }
}

/// Default-output-device playback. Lives on the audio thread.
pub struct AudioPlayback {
    /// Must be kept alive for the output to keep running.
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sample_rate: u32,
    track: Option<Track>,
    gate: SuppressionGate,
}

impl AudioPlayback {
    /// Open the default output device.
    pub fn connect(format: PlaybackFormat, gate: SuppressionGate) -> Result<Self, PortError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| PortError::Unavailable(e.to_string()))?;

        tracing::info!(sample_rate = format.sample_rate, "Audio playback connected");

        Ok(Self {
            _stream: stream,
            stream_handle,
            sample_rate: format.sample_rate,
            track: None,
            gate,
        })
    }

    /// Queue `pcm` on `track`.
    pub fn enqueue(&mut self, pcm: Vec<i16>, track: TrackId) -> Result<(), PortError> {
        if pcm.is_empty() {
            return Ok(());
        }

        let reuse = self.track.as_ref().is_some_and(|t| t.id == track);
        if !reuse {
            if let Some(old) = self.track.take() {
                old.sink.stop();
                tracing::debug!(old = %old.id, new = %track, "Replacing playback track");
            }
            let sink = Sink::try_new(&self.stream_handle)
                .map_err(|e| PortError::Playback(e.to_string()))?;
            self.track = Some(Track {
                id: track,
                sink,
                chunks: Vec::new(),
                samples: Vec::new(),
            });
        }

        if let Some(current) = self.track.as_mut() {
            current.chunks.push(pcm.len());
            current.samples.extend_from_slice(&pcm);
            current
                .sink
                .append(SamplesBuffer::new(1, self.sample_rate, pcm));
        }

        self.gate.suppress();
        Ok(())
    }

    /// Stop immediately, discarding queued audio.
    pub fn interrupt(&mut self) -> Option<TrackOffset> {
        let offset = self.current_offset();
        if let Some(track) = self.track.take() {
            track.sink.stop();
            tracing::debug!(track = %track.id, "Playback interrupted");
        }
        self.gate.release();
        offset
    }

    /// Position in the current track, or `None` once it has drained.
    ///
    /// Opens the suppression gate when the track is found drained.
    pub fn current_offset(&mut self) -> Option<TrackOffset> {
        let Some(track) = self.track.as_ref() else {
            self.gate.release();
            return None;
        };

        if track.sink.empty() {
            self.gate.release();
            return None;
        }

        Some(TrackOffset {
            track: track.id,
            samples: track.position(self.sample_rate),
        })
    }

    /// Levels of the samples just after the current position.
    pub fn amplitude_summary(&mut self) -> Vec<f32> {
        let Some(offset) = self.current_offset() else {
            return Vec::new();
        };
        let Some(track) = self.track.as_ref() else {
            return Vec::new();
        };

        let start = usize::try_from(offset.samples)
            .unwrap_or(usize::MAX)
            .min(track.samples.len());
        let end = start.saturating_add(SUMMARY_WINDOW).min(track.samples.len());
        levels::amplitude_bands(&track.samples[start..end], SUMMARY_BANDS)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn duration_to_samples(position: Duration, sample_rate: u32) -> u64 {
    (position.as_secs_f64() * f64::from(sample_rate)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_conversion() {
        assert_eq!(duration_to_samples(Duration::from_millis(500), 24_000), 12_000);
        assert_eq!(duration_to_samples(Duration::ZERO, 24_000), 0);
    }
}
