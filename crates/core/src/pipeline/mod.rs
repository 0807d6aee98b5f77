mod stream;

use crate::asr::{AsrSetupError, TranscriptionEngine, TranscriptionResult};
use crate::config::AppConfig;
use crate::decode::{AudioBuffer, AudioUpload, Normalized, Normalizer, StrategyFailure};
use crate::emotion::{
    classify, EmotionReport, FusionInputs, HeartRateSummary, Vitals, VitalsOverview,
    VolumeSummary,
};
use crate::features::{AcousticFeatures, FeatureExtractor};
use crate::lexical::{self, LexicalFeatures, SentimentScores, WordCount, TOP_WORDS};
use crate::util::panic_message;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub use stream::{StreamSummary, WindowReport, LIVE_SOURCE, STREAM_WINDOW_STRATEGY};

const LOG_TARGET: &str = "pipeline";

pub const ACCEPTED_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "flac"];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("empty audio upload")]
    EmptyInput,
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("audio processing failed: {0}")]
    Processing(String),
}

impl PipelineError {
    /// True for rejections caused by the caller's input rather than by processing.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::EmptyInput | PipelineError::UnsupportedFormat(_)
        )
    }
}

/// Pre-flight check: the format is judged before emptiness.
pub fn validate_upload(upload: &AudioUpload) -> Result<(), PipelineError> {
    let by_extension = upload
        .extension()
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()));
    let by_media_type = upload
        .media_type()
        .is_some_and(|mt| mt.starts_with("audio/"));

    if !by_extension && !by_media_type {
        let described = upload
            .file_name
            .clone()
            .or_else(|| upload.content_type.clone())
            .unwrap_or_else(|| "unknown".to_owned());
        return Err(PipelineError::UnsupportedFormat(described));
    }
    if upload.bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NormalizationSummary {
    pub strategy: &'static str,
    pub duration_secs: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<StrategyFailure>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AudioAnalysisReport {
    #[serde(flatten)]
    pub emotion: EmotionReport,
    pub transcript: TranscriptionResult,
    pub acoustic: AcousticFeatures,
    pub word_frequency: Vec<WordCount>,
    pub repeated_words: BTreeMap<String, usize>,
    pub sentiment: SentimentScores,
    pub heart_rate: HeartRateSummary,
    pub volume: VolumeSummary,
    pub overview: VitalsOverview,
    pub normalization: NormalizationSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextScoreReport {
    #[serde(flatten)]
    pub emotion: EmotionReport,
    pub word_frequency: Vec<WordCount>,
    pub repeated_words: BTreeMap<String, usize>,
    pub sentiment: SentimentScores,
    pub heart_rate: HeartRateSummary,
    pub volume: VolumeSummary,
    pub overview: VitalsOverview,
}

/// Wires the stages together; the same engines serve whole clips and stream windows.
#[derive(Clone)]
pub struct EmotionPipeline {
    normalizer: Normalizer,
    transcriber: TranscriptionEngine,
    features: FeatureExtractor,
}

impl EmotionPipeline {
    pub fn new(
        normalizer: Normalizer,
        transcriber: TranscriptionEngine,
        features: FeatureExtractor,
    ) -> Self {
        Self {
            normalizer,
            transcriber,
            features,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, AsrSetupError> {
        let normalizer = Normalizer::from_config(&cfg.normalizer);
        let transcriber = TranscriptionEngine::from_config(&cfg.recognition)?;
        tracing::debug!(
            target: LOG_TARGET,
            strategies = ?normalizer.strategy_names(),
            recognizers = ?transcriber.recognizer_names(),
            "pipeline assembled"
        );
        Ok(Self::new(
            normalizer,
            transcriber,
            FeatureExtractor::new(cfg.features),
        ))
    }

    pub async fn analyze_audio(
        &self,
        upload: &AudioUpload,
        vitals: &Vitals,
    ) -> Result<AudioAnalysisReport, PipelineError> {
        validate_upload(upload)?;
        let normalized = self.normalizer.normalize(upload).await;
        self.analyze_normalized(normalized, vitals).await
    }

    /// Analyzes an already-canonical buffer, e.g. one window of a longer recording.
    pub async fn analyze_buffer(
        &self,
        buffer: AudioBuffer,
        vitals: &Vitals,
    ) -> Result<AudioAnalysisReport, PipelineError> {
        let normalized = Normalized {
            buffer,
            strategy: STREAM_WINDOW_STRATEGY,
            failures: Vec::new(),
        };
        self.analyze_normalized(normalized, vitals).await
    }

    async fn analyze_normalized(
        &self,
        normalized: Normalized,
        vitals: &Vitals,
    ) -> Result<AudioAnalysisReport, PipelineError> {
        let Normalized {
            buffer,
            strategy,
            failures,
        } = normalized;

        let transcript = self.transcriber.transcribe(&buffer).await;

        let extractor = self.features;
        let acoustic = catch_unwind(AssertUnwindSafe(|| extractor.extract(&buffer)))
            .map_err(|payload| {
                let reason = panic_message(payload.as_ref());
                tracing::error!(target: LOG_TARGET, %reason, "feature extraction panicked");
                PipelineError::Processing(reason)
            })?;

        let lexical = lexical::analyze(&transcript.text);
        let mean_volume = if vitals.volume.is_empty() {
            acoustic.average_volume
        } else {
            vitals.volume.mean()
        };
        let emotion = fuse(&lexical, vitals, mean_volume);
        let heart_rate = vitals.heart_rate.summary();
        let overview = VitalsOverview::build(&heart_rate, &emotion);

        tracing::info!(
            target: LOG_TARGET,
            emotion = ?emotion.emotion,
            confidence = emotion.confidence,
            provenance = %transcript.provenance,
            strategy,
            "audio analyzed"
        );

        Ok(AudioAnalysisReport {
            emotion,
            word_frequency: lexical.top_words(TOP_WORDS),
            repeated_words: lexical.repeated_words,
            sentiment: lexical.sentiment,
            heart_rate,
            volume: vitals.volume.summary(),
            overview,
            normalization: NormalizationSummary {
                strategy,
                duration_secs: buffer.duration().as_secs_f32(),
                failures,
            },
            transcript,
            acoustic,
        })
    }

    /// Text-only scoring; without a volume series the mean volume is 0.
    pub fn score_transcript(&self, text: &str, vitals: &Vitals) -> TextScoreReport {
        let lexical = lexical::analyze(text);
        let emotion = fuse(&lexical, vitals, vitals.volume.mean());
        let heart_rate = vitals.heart_rate.summary();
        let overview = VitalsOverview::build(&heart_rate, &emotion);
        tracing::info!(
            target: LOG_TARGET,
            emotion = ?emotion.emotion,
            tokens = lexical.token_count,
            "transcript scored"
        );
        TextScoreReport {
            emotion,
            word_frequency: lexical.top_words(TOP_WORDS),
            repeated_words: lexical.repeated_words,
            sentiment: lexical.sentiment,
            heart_rate,
            volume: vitals.volume.summary(),
            overview,
        }
    }
}

fn fuse(lexical: &LexicalFeatures, vitals: &Vitals, mean_volume: f32) -> EmotionReport {
    EmotionReport::from(classify(FusionInputs {
        max_bpm: vitals.heart_rate.max_bpm(),
        mean_volume,
        repetition_count: lexical.repetition_count,
        sentiment_compound: lexical.sentiment.compound,
    }))
}
