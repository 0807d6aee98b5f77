//! Scalar acoustic summaries of a normalized clip: loudness and a spectral pitch estimate.

use crate::config::FeatureDefaults;
use crate::decode::AudioBuffer;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "features";

pub const FRAME_LEN: usize = 2048;
pub const HOP_LEN: usize = 512;
pub const PITCH_BAND_HZ: (f32, f32) = (150.0, 4000.0);
const VOLUME_GAIN: f32 = 10.0;
const LOW_LEVEL: f32 = 0.02;
const HIGH_LEVEL: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeLevel {
    Low,
    Normal,
    High,
}

impl VolumeLevel {
    /// Classifies the raw mean absolute amplitude.
    pub fn from_mean_abs(mean_abs: f32) -> Self {
        if mean_abs < LOW_LEVEL {
            VolumeLevel::Low
        } else if mean_abs > HIGH_LEVEL {
            VolumeLevel::High
        } else {
            VolumeLevel::Normal
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcousticFeatures {
    /// Mean |x| scaled by 10 and clamped to [0, 1].
    pub average_volume: f32,
    /// Hz; 0.0 when no frame carried a usable spectrum.
    pub average_pitch: f32,
    pub volume_level: VolumeLevel,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FeatureExtractor {
    defaults: FeatureDefaults,
}

impl FeatureExtractor {
    pub fn new(defaults: FeatureDefaults) -> Self {
        Self { defaults }
    }

    pub fn extract(&self, audio: &AudioBuffer) -> AcousticFeatures {
        let mean_abs = audio.mean_abs();

        let mut average_volume = (mean_abs * VOLUME_GAIN).clamp(0.0, 1.0);
        if !average_volume.is_finite() {
            tracing::warn!(target: LOG_TARGET, "volume not finite, using default");
            average_volume = self.defaults.volume;
        }

        let mut average_pitch = spectral_pitch(audio.samples(), audio.sample_rate());
        if !average_pitch.is_finite() {
            tracing::warn!(target: LOG_TARGET, "pitch not finite, using default");
            average_pitch = self.defaults.pitch_hz;
        }

        let features = AcousticFeatures {
            average_volume,
            average_pitch,
            volume_level: VolumeLevel::from_mean_abs(mean_abs),
        };
        tracing::debug!(
            target: LOG_TARGET,
            volume = features.average_volume,
            pitch_hz = features.average_pitch,
            level = ?features.volume_level,
            "acoustic features extracted"
        );
        features
    }
}

struct FrameSpectrum {
    centroid: f32,
    peak: f32,
}

/// Mean in-band spectral centroid over frames whose peak magnitude reaches the median peak.
///
/// NaN when the input holds non-finite samples.
pub fn spectral_pitch(samples: &[f32], sample_rate: u32) -> f32 {
    if samples.is_empty() || sample_rate == 0 {
        return 0.0;
    }
    if samples.iter().any(|s| !s.is_finite()) {
        return f32::NAN;
    }

    let bin_hz = sample_rate as f32 / FRAME_LEN as f32;
    let (lo_hz, hi_hz) = PITCH_BAND_HZ;
    let lo_bin = (lo_hz / bin_hz).ceil() as usize;
    let hi_bin = ((hi_hz / bin_hz).floor() as usize).min(FRAME_LEN / 2);
    if lo_bin > hi_bin {
        return 0.0;
    }

    let window = hann(FRAME_LEN);
    let fft = FftPlanner::<f32>::new().plan_fft_forward(FRAME_LEN);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); FRAME_LEN];

    let frames: Vec<FrameSpectrum> = frame_starts(samples.len())
        .map(|start| {
            let end = (start + FRAME_LEN).min(samples.len());
            for (i, slot) in buffer.iter_mut().enumerate() {
                let x = if start + i < end { samples[start + i] } else { 0.0 };
                *slot = Complex::new(x * window[i], 0.0);
            }
            fft.process(&mut buffer);

            let mut weighted = 0.0f32;
            let mut total = 0.0f32;
            let mut peak = 0.0f32;
            for (k, c) in buffer.iter().enumerate().take(hi_bin + 1).skip(lo_bin) {
                let mag = c.norm();
                weighted += k as f32 * bin_hz * mag;
                total += mag;
                peak = peak.max(mag);
            }
            let centroid = if total > 0.0 { weighted / total } else { 0.0 };
            FrameSpectrum { centroid, peak }
        })
        .collect();

    let median = median(frames.iter().map(|f| f.peak).collect());
    let reliable: Vec<f32> = frames
        .iter()
        .filter(|f| f.peak > 0.0 && f.peak >= median)
        .map(|f| f.centroid)
        .collect();

    if reliable.is_empty() {
        return 0.0;
    }
    reliable.iter().sum::<f32>() / reliable.len() as f32
}

fn frame_starts(len: usize) -> impl Iterator<Item = usize> {
    let last = len.saturating_sub(FRAME_LEN);
    (0..=last).step_by(HOP_LEN)
}

fn hann(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / len as f32;
            0.5 - 0.5 * phase.cos()
        })
        .collect()
}

fn median(mut values: Vec<f32>) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
