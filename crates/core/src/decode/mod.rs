mod container;
#[cfg(feature = "ffmpeg")]
mod ffmpeg;
mod passthrough;
mod resample;
mod wav;

use crate::config::NormalizerConfig;
use crate::util::panic_message;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

pub use container::ContainerDecode;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegDecode;
pub use passthrough::PassThrough;
pub use resample::resample;
pub use wav::encode_wav_i16;

pub const TARGET_SAMPLE_RATE: u32 = 16_000;
pub const FALLBACK_SILENCE: Duration = Duration::from_secs(5);
pub const SILENCE_STRATEGY: &str = "silence";

const LOG_TARGET: &str = "decode::normalizer";

/// Canonical PCM: mono `f32` samples in [-1, 1] at a known sample rate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(DecodeError::InvalidPcm("sample rate must be > 0".to_owned()));
        }
        if samples.is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(Self {
            samples,
            sample_rate,
            channels: 1,
        })
    }

    pub fn silence(duration: Duration) -> Self {
        let frames = (duration.as_secs_f64() * f64::from(TARGET_SAMPLE_RATE)).round() as usize;
        Self {
            samples: vec![0.0; frames.max(1)],
            sample_rate: TARGET_SAMPLE_RATE,
            channels: 1,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        duration_from_sample_count(self.sample_rate, self.channels, self.samples.len())
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    pub fn mean_abs(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|s| f64::from(s.abs())).sum();
        (sum / self.samples.len() as f64) as f32
    }

    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self.samples.iter().map(|s| f64::from(*s) * f64::from(*s)).sum();
        (sum_sq / self.samples.len() as f64).sqrt() as f32
    }

    pub fn to_i16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|s| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16)
            .collect()
    }

    pub fn to_wav_bytes(&self) -> std::result::Result<Vec<u8>, hound::Error> {
        encode_wav_i16(&self.to_i16(), self.sample_rate, self.channels)
    }
}

/// An upload as received at the transport boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl AudioUpload {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: None,
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Lower-cased extension of the declared file name.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name.as_deref()?;
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Media type without parameters, lower-cased.
    pub fn media_type(&self) -> Option<String> {
        let ct = self.content_type.as_deref()?;
        let essence = ct.split(';').next().unwrap_or(ct).trim();
        if essence.is_empty() {
            None
        } else {
            Some(essence.to_ascii_lowercase())
        }
    }

    /// Container extension to hint decoders with, from the file name or the content type.
    pub fn format_hint(&self) -> Option<String> {
        if let Some(ext) = self.extension() {
            return Some(ext);
        }
        let ext = match self.media_type()?.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => "wav",
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "audio/aac" => "m4a",
            "audio/flac" | "audio/x-flac" => "flac",
            "audio/ogg" => "ogg",
            _ => return None,
        };
        Some(ext.to_owned())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("ffmpeg unavailable: {0}")]
    FfmpegUnavailable(String),

    #[error("ffmpeg failed: {0}")]
    FfmpegFailed(String),

    #[error("invalid pcm output: {0}")]
    InvalidPcm(String),

    #[error("container decode failed: {0}")]
    Container(#[from] symphonia::core::errors::Error),

    #[error("wav read failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("no decodable audio track")]
    NoTrack,

    #[error("resample failed: {0}")]
    Resample(String),

    #[error("decoded stream contained no samples")]
    Empty,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Upload bytes plus a temp-file spool for decoders that need a seekable path.
///
/// The spool is deleted when the source is dropped.
pub struct DecodeSource {
    bytes: Bytes,
    hint: Option<String>,
    spool: Option<NamedTempFile>,
}

impl DecodeSource {
    pub fn spool(upload: &AudioUpload) -> Self {
        let hint = upload.format_hint();
        let spool = match write_spool(&upload.bytes, hint.as_deref()) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "could not spool upload, decoding from memory");
                None
            }
        };
        Self {
            bytes: upload.bytes.clone(),
            hint,
            spool,
        }
    }

    pub fn in_memory(bytes: Bytes, hint: Option<String>) -> Self {
        Self {
            bytes,
            hint,
            spool: None,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.spool.as_ref().map(NamedTempFile::path)
    }

    pub fn reopen(&self) -> Option<std::io::Result<File>> {
        self.spool.as_ref().map(NamedTempFile::reopen)
    }
}

fn write_spool(bytes: &[u8], ext: Option<&str>) -> std::io::Result<NamedTempFile> {
    let suffix = ext.map(|e| format!(".{e}")).unwrap_or_default();
    let mut file = tempfile::Builder::new()
        .prefix("calmpulse-")
        .suffix(&suffix)
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

pub trait NormalizeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn normalize<'a>(&'a self, source: &'a DecodeSource) -> BoxFuture<'a, Result<AudioBuffer>>;
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: &'static str,
    pub reason: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Normalized {
    pub buffer: AudioBuffer,
    pub strategy: &'static str,
    pub failures: Vec<StrategyFailure>,
}

/// Runs decode strategies in order; the last resort is synthetic silence, so this never fails.
#[derive(Clone)]
pub struct Normalizer {
    strategies: Vec<Arc<dyn NormalizeStrategy>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&NormalizerConfig::default())
    }
}

impl Normalizer {
    pub fn new(strategies: Vec<Arc<dyn NormalizeStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn from_config(cfg: &NormalizerConfig) -> Self {
        let mut strategies: Vec<Arc<dyn NormalizeStrategy>> =
            vec![Arc::new(ContainerDecode::default())];

        #[cfg(feature = "ffmpeg")]
        if cfg.use_ffmpeg {
            strategies.push(Arc::new(FfmpegDecode::new(cfg.ffmpeg_auto_download)));
        }
        #[cfg(not(feature = "ffmpeg"))]
        if cfg.use_ffmpeg {
            tracing::warn!(target: LOG_TARGET, "ffmpeg decode requested but the `ffmpeg` feature is disabled");
        }

        strategies.push(Arc::new(PassThrough::default()));
        Self::new(strategies)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn normalize(&self, upload: &AudioUpload) -> Normalized {
        let source = DecodeSource::spool(upload);
        self.normalize_source(&source).await
    }

    pub async fn normalize_source(&self, source: &DecodeSource) -> Normalized {
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            let name = strategy.name();
            match AssertUnwindSafe(strategy.normalize(source))
                .catch_unwind()
                .await
            {
                Ok(Ok(buffer)) => {
                    tracing::info!(
                        target: LOG_TARGET,
                        strategy = name,
                        samples = buffer.len(),
                        duration_s = buffer.duration().as_secs_f32(),
                        "audio normalized"
                    );
                    return Normalized {
                        buffer,
                        strategy: name,
                        failures,
                    };
                }
                Ok(Err(e)) => {
                    tracing::debug!(target: LOG_TARGET, strategy = name, error = %e, "decode strategy failed");
                    failures.push(StrategyFailure {
                        strategy: name,
                        reason: e.to_string(),
                    });
                }
                Err(payload) => {
                    let reason = format!("panicked: {}", panic_message(payload.as_ref()));
                    tracing::warn!(target: LOG_TARGET, strategy = name, %reason, "decode strategy aborted");
                    failures.push(StrategyFailure {
                        strategy: name,
                        reason,
                    });
                }
            }
        }

        tracing::warn!(
            target: LOG_TARGET,
            attempts = failures.len(),
            "no strategy could decode the input, substituting silence"
        );
        Normalized {
            buffer: AudioBuffer::silence(FALLBACK_SILENCE),
            strategy: SILENCE_STRATEGY,
            failures,
        }
    }
}

/// Averages interleaved frames into mono and appends them to `out`.
pub(crate) fn downmix_into(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

pub fn i16_to_f32_pcm(samples: &[i16]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let scale = 1.0f32 / 32768.0f32;
    samples.iter().map(|&s| f32::from(s) * scale).collect()
}

pub fn duration_from_sample_count(
    sample_rate_hz: u32,
    channels: u16,
    sample_count: usize,
) -> Duration {
    if sample_rate_hz == 0 || channels == 0 {
        return Duration::from_secs(0);
    }
    let frames = sample_count / usize::from(channels);
    let micros = (u128::from(frames as u64) * 1_000_000u128) / u128::from(sample_rate_hz);
    Duration::from_micros(micros.min(u128::from(u64::MAX)) as u64)
}
