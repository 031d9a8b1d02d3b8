//! Microphone capture via `cpal`.
//!
//! Device samples arrive on the cpal callback thread in the device's native
//! rate and channel layout. The [`Framer`] downmixes them to mono, resamples
//! to the capture rate, cuts fixed-size PCM16 frames and pushes each one,
//! with its amplitude bands, to the installed [`FrameSink`]. While the
//! suppression gate is closed the callback drops its input.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig, SupportedStreamConfig};
use parley_core::{CaptureFormat, CaptureFrame, FrameSink, PortError};
use rubato::{FftFixedIn, Resampler as _};

use crate::gate::SuppressionGate;
use crate::levels;

/// Input chunk handed to the resampler.
const RESAMPLE_CHUNK: usize = 1024;

// ── Framer ─────────────────────────────────────────────────────────

/// Turns interleaved device samples into capture frames.
pub struct Framer {
    channels: usize,
    frame_size: usize,
    bands: usize,
    resampler: Option<FftFixedIn<f32>>,
    /// Mono samples waiting for a full resampler chunk.
    resample_in: Vec<f32>,
    /// Mono samples at the capture rate waiting for a full frame.
    pending: Vec<f32>,
    sink: Option<FrameSink>,
}

impl Framer {
    /// Create a framer for a device producing `channels` interleaved
    /// channels at `device_rate`.
    pub fn new(device_rate: u32, channels: u16, format: CaptureFormat) -> Result<Self, PortError> {
        let resampler = if device_rate == format.sample_rate {
            None
        } else {
            Some(
                FftFixedIn::<f32>::new(
                    device_rate as usize,
                    format.sample_rate as usize,
                    RESAMPLE_CHUNK,
                    2,
                    1,
                )
                .map_err(|e| PortError::Capture(format!("resampler: {e}")))?,
            )
        };

        Ok(Self {
            channels: usize::from(channels.max(1)),
            frame_size: format.frame_size.max(1),
            bands: format.bands,
            resampler,
            resample_in: Vec::new(),
            pending: Vec::new(),
            sink: None,
        })
    }

    /// Replace the frame sink.
    pub fn set_sink(&mut self, sink: Option<FrameSink>) {
        self.sink = sink;
    }

    /// Drop any partially assembled frame.
    pub fn clear(&mut self) {
        self.resample_in.clear();
        self.pending.clear();
    }

    /// Feed interleaved device samples in `[-1.0, 1.0]`.
    pub fn push_interleaved(&mut self, data: &[f32]) {
        let mono = downmix(data, self.channels);

        match self.resampler.as_mut() {
            None => self.pending.extend_from_slice(&mono),
            Some(resampler) => {
                self.resample_in.extend_from_slice(&mono);
                loop {
                    let needed = resampler.input_frames_next();
                    if self.resample_in.len() < needed {
                        break;
                    }
                    let chunk: Vec<f32> = self.resample_in.drain(..needed).collect();
                    match resampler.process(&[chunk], None) {
                        Ok(out) => {
                            if let Some(channel) = out.first() {
                                self.pending.extend_from_slice(channel);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Capture resampling failed, chunk dropped");
                        }
                    }
                }
            }
        }

        while self.pending.len() >= self.frame_size {
            let samples: Vec<f32> = self.pending.drain(..self.frame_size).collect();
            let pcm = levels::f32_to_pcm(&samples);
            let amplitudes = levels::amplitude_bands(&pcm, self.bands);
            if let Some(sink) = self.sink.as_mut() {
                sink(CaptureFrame { pcm, amplitudes });
            }
        }
    }
}

/// Average interleaved channels into mono.
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    #[allow(clippy::cast_precision_loss)]
    let scale = 1.0 / channels as f32;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

// ── AudioCapture ───────────────────────────────────────────────────

/// Default-input-device capture. Lives on the audio thread.
pub struct AudioCapture {
    device: Device,
    config: SupportedStreamConfig,
    stream: Option<Stream>,
    framer: Arc<Mutex<Framer>>,
    streaming: Arc<AtomicBool>,
    gate: SuppressionGate,
}

impl AudioCapture {
    /// Acquire the default input device.
    pub fn open(format: CaptureFormat, gate: SuppressionGate) -> Result<Self, PortError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| PortError::Unavailable("no input device".to_string()))?;

        let config = device
            .default_input_config()
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        let device_rate = config.sample_rate().0;
        let channels = config.channels();
        let framer = Framer::new(device_rate, channels, format)?;

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = device_rate,
            channels,
            target_rate = format.sample_rate,
            "Audio capture opened"
        );

        Ok(Self {
            device,
            config,
            stream: None,
            framer: Arc::new(Mutex::new(framer)),
            streaming: Arc::new(AtomicBool::new(false)),
            gate,
        })
    }

    /// Install `sink` and start the input stream.
    pub fn start_streaming(&mut self, sink: FrameSink) -> Result<(), PortError> {
        lock(&self.framer).set_sink(Some(sink));

        if self.stream.is_none() {
            self.stream = Some(self.build_input_stream()?);
        }
        if let Some(stream) = &self.stream {
            stream
                .play()
                .map_err(|e| PortError::Capture(e.to_string()))?;
        }

        self.streaming.store(true, Ordering::SeqCst);
        tracing::debug!("Audio capture streaming");
        Ok(())
    }

    /// Stop delivering frames. The stream stays built for the next session.
    pub fn pause(&mut self) -> Result<(), PortError> {
        self.streaming.store(false, Ordering::SeqCst);
        if let Some(stream) = &self.stream {
            stream
                .pause()
                .map_err(|e| PortError::Capture(e.to_string()))?;
        }
        lock(&self.framer).set_sink(None);
        tracing::debug!("Audio capture paused");
        Ok(())
    }

    /// Drop any partially assembled frame.
    pub fn clear(&self) {
        lock(&self.framer).clear();
    }

    fn build_input_stream(&self) -> Result<Stream, PortError> {
        let stream_config: StreamConfig = self.config.clone().into();
        let sample_format = self.config.sample_format();

        let err_fn = |err: cpal::StreamError| {
            tracing::error!(%err, "Audio input stream error");
        };

        let stream = match sample_format {
            SampleFormat::F32 => {
                let mut feed = self.feeder();
                self.device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| feed(data),
                    err_fn,
                    None,
                )
            }
            SampleFormat::I16 => {
                let mut feed = self.feeder();
                self.device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let float_data: Vec<f32> =
                            data.iter().map(|&s| f32::from(s) / 32_768.0).collect();
                        feed(&float_data);
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::I32 => {
                let mut feed = self.feeder();
                self.device.build_input_stream(
                    &stream_config,
                    move |data: &[i32], _: &cpal::InputCallbackInfo| {
                        #[allow(clippy::cast_precision_loss)]
                        let float_data: Vec<f32> =
                            data.iter().map(|&s| s as f32 / 2_147_483_648.0).collect();
                        feed(&float_data);
                    },
                    err_fn,
                    None,
                )
            }
            _ => {
                return Err(PortError::Capture(format!(
                    "Unsupported sample format: {sample_format:?}"
                )));
            }
        };

        stream.map_err(|e| PortError::Capture(e.to_string()))
    }

    /// Callback body shared by every sample format.
    fn feeder(&self) -> impl FnMut(&[f32]) + Send + 'static {
        let framer = Arc::clone(&self.framer);
        let streaming = Arc::clone(&self.streaming);
        let gate = self.gate.clone();

        move |data: &[f32]| {
            if !streaming.load(Ordering::Relaxed) || gate.is_suppressed() {
                return;
            }
            lock(&framer).push_interleaved(data);
        }
    }
}

fn lock(framer: &Mutex<Framer>) -> MutexGuard<'_, Framer> {
    framer.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
