//! Amplitude helpers shared by the detector, the devices and the
//! visualisation bars.
//!
//! All levels are normalised to `[0.0, 1.0]`.

/// RMS of `samples` mapped onto `[0.0, 1.0]`.
///
/// An RMS of ~0.3 (very loud speech) saturates the scale.
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();

    #[allow(clippy::cast_precision_loss)]
    let rms = (sum_sq / samples.len() as f32).sqrt();

    (rms / 0.3).min(1.0)
}

/// Convert PCM16 samples to `f32` in `[-1.0, 1.0]`.
pub fn pcm_to_f32(pcm: &[i16]) -> Vec<f32> {
    pcm.iter().map(|&s| f32::from(s) / 32_768.0).collect()
}

/// Convert `f32` samples to PCM16, clamping out-of-range values.
#[allow(clippy::cast_possible_truncation)]
pub fn f32_to_pcm(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32_767.0) as i16)
        .collect()
}

/// Split `pcm` into `bands` consecutive slices and return the level of each.
///
/// Trailing bands are zero when there are fewer samples than bands.
pub fn amplitude_bands(pcm: &[i16], bands: usize) -> Vec<f32> {
    if bands == 0 {
        return Vec::new();
    }
    let samples = pcm_to_f32(pcm);
    let chunk = samples.len().div_ceil(bands).max(1);

    let mut levels: Vec<f32> = samples.chunks(chunk).map(rms_level).collect();
    levels.resize(bands, 0.0);
    levels
}

/// Fit an arbitrary-length amplitude summary into exactly `bars` values by
/// averaging neighbouring samples.
///
/// An empty summary yields all-zero bars.
pub fn fit_bars(values: &[f32], bars: usize) -> Vec<f32> {
    if values.is_empty() || bars == 0 {
        return vec![0.0; bars];
    }

    (0..bars)
        .map(|i| {
            let start = i * values.len() / bars;
            let end = ((i + 1) * values.len() / bars).max(start + 1);
            mean(&values[start..end.min(values.len())])
                .unwrap_or(0.0)
                .clamp(0.0, 1.0)
        })
        .collect()
}

/// Arithmetic mean, or `None` for an empty window.
pub fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    Some(values.iter().sum::<f32>() / values.len() as f32)
}
