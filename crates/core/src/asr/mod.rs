mod diagnostics;
mod local;
mod remote;

use crate::config::{Locale, RecognitionConfig};
use crate::decode::AudioBuffer;
use crate::util::{panic_message, RetryConfig};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Serialize, Serializer};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

pub use diagnostics::{diagnose, SignalDiagnosis};
pub use local::LocalWhisperRecognizer;
pub use remote::{RemoteRecognizer, ResponseMode};

const LOG_TARGET: &str = "asr::engine";

/// Which attempt produced a transcript. Serialized as `primary`, `fallback-<n>` or `diagnostic`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provenance {
    Primary,
    /// 1-based attempt number, always >= 2.
    Fallback(usize),
    Diagnostic,
}

impl Provenance {
    pub fn for_attempt(attempt: usize) -> Self {
        if attempt <= 1 {
            Provenance::Primary
        } else {
            Provenance::Fallback(attempt)
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Primary => f.write_str("primary"),
            Provenance::Fallback(n) => write!(f, "fallback-{n}"),
            Provenance::Diagnostic => f.write_str("diagnostic"),
        }
    }
}

impl Serialize for Provenance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub confidence: Option<f32>,
}

impl Recognition {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognizeError {
    #[error("no speech detected")]
    NoSpeech,
    #[error("recognition service unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected recognizer failure: {0}")]
    Unexpected(String),
}

impl RecognizeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RecognizeError::NoSpeech => FailureKind::NoSpeech,
            RecognizeError::Unavailable(_) => FailureKind::Unavailable,
            RecognizeError::Unexpected(_) => FailureKind::Unexpected,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AsrSetupError {
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

pub trait Recognizer: Send + Sync {
    fn name(&self) -> &str;

    fn recognize<'a>(
        &'a self,
        audio: &'a AudioBuffer,
    ) -> BoxFuture<'a, Result<Recognition, RecognizeError>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoSpeech,
    Unavailable,
    Unexpected,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttemptFailure {
    pub attempt: usize,
    pub recognizer: String,
    pub kind: FailureKind,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub confidence: Option<f32>,
    pub provenance: Provenance,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<AttemptFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<SignalDiagnosis>,
}

/// Tries each recognizer in order; the first non-blank transcript wins.
///
/// When every attempt fails the transcript is a diagnostic placeholder chosen from signal
/// statistics, so the result always carries text.
#[derive(Clone)]
pub struct TranscriptionEngine {
    attempts: Vec<Arc<dyn Recognizer>>,
}

impl TranscriptionEngine {
    pub fn new(attempts: Vec<Arc<dyn Recognizer>>) -> Self {
        Self { attempts }
    }

    pub fn from_config(cfg: &RecognitionConfig) -> Result<Self, AsrSetupError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = cfg.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        let retry = RetryConfig::new(cfg.retries, Duration::from_millis(250));

        let remote = |locale: Locale, mode: ResponseMode| {
            RemoteRecognizer::new(
                client.clone(),
                cfg.endpoint.clone(),
                cfg.api_key.clone(),
                locale,
                mode,
            )
            .with_retry(retry.clone())
        };

        let mut attempts: Vec<Arc<dyn Recognizer>> = vec![
            Arc::new(remote(cfg.primary_locale.clone(), ResponseMode::BestText)),
            Arc::new(remote(cfg.primary_locale.clone(), ResponseMode::FullEnvelope)),
            Arc::new(remote(cfg.alternate_locale.clone(), ResponseMode::BestText)),
        ];

        if let Some(local) = &cfg.local_whisper {
            attempts.push(Arc::new(LocalWhisperRecognizer::new(client.clone(), local.clone())));
        }

        Ok(Self::new(attempts))
    }

    pub fn recognizer_names(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.name()).collect()
    }

    pub async fn transcribe(&self, audio: &AudioBuffer) -> TranscriptionResult {
        let mut failures = Vec::new();

        for (idx, recognizer) in self.attempts.iter().enumerate() {
            let attempt = idx + 1;
            let outcome = match AssertUnwindSafe(recognizer.recognize(audio))
                .catch_unwind()
                .await
            {
                Ok(Ok(recognition)) if recognition.text.trim().is_empty() => {
                    Err(RecognizeError::NoSpeech)
                }
                Ok(result) => result,
                Err(payload) => Err(RecognizeError::Unexpected(format!(
                    "panicked: {}",
                    panic_message(payload.as_ref())
                ))),
            };

            match outcome {
                Ok(recognition) => {
                    let provenance = Provenance::for_attempt(attempt);
                    tracing::info!(
                        target: LOG_TARGET,
                        recognizer = recognizer.name(),
                        %provenance,
                        chars = recognition.text.len(),
                        "transcript recognized"
                    );
                    return TranscriptionResult {
                        text: recognition.text.trim().to_owned(),
                        confidence: recognition.confidence,
                        provenance,
                        failures,
                        diagnosis: None,
                    };
                }
                Err(e) => {
                    tracing::debug!(
                        target: LOG_TARGET,
                        attempt,
                        recognizer = recognizer.name(),
                        error = %e,
                        "recognition attempt failed"
                    );
                    failures.push(AttemptFailure {
                        attempt,
                        recognizer: recognizer.name().to_owned(),
                        kind: e.kind(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let diagnosis = diagnose(audio);
        tracing::warn!(
            target: LOG_TARGET,
            attempts = failures.len(),
            ?diagnosis,
            "all recognizers failed, using diagnostic placeholder"
        );
        TranscriptionResult {
            text: diagnosis.placeholder().to_owned(),
            confidence: None,
            provenance: Provenance::Diagnostic,
            failures,
            diagnosis: Some(diagnosis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::TARGET_SAMPLE_RATE;

    struct Scripted {
        name: &'static str,
        result: Result<Recognition, RecognizeError>,
    }

    impl Recognizer for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn recognize<'a>(
            &'a self,
            _audio: &'a AudioBuffer,
        ) -> BoxFuture<'a, Result<Recognition, RecognizeError>> {
            let result = self.result.clone();
            async move { result }.boxed()
        }
    }

    struct Exploding;

    fn malformed_reply() -> Result<Recognition, RecognizeError> {
        panic!("malformed reply")
    }

    impl Recognizer for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }

        fn recognize<'a>(
            &'a self,
            _audio: &'a AudioBuffer,
        ) -> BoxFuture<'a, Result<Recognition, RecognizeError>> {
            async move { malformed_reply() }.boxed()
        }
    }

    fn scripted(name: &'static str, result: Result<Recognition, RecognizeError>) -> Arc<dyn Recognizer> {
        Arc::new(Scripted { name, result })
    }

    fn failing_engine() -> TranscriptionEngine {
        TranscriptionEngine::new(vec![
            scripted("a", Err(RecognizeError::Unavailable("offline".into()))),
            scripted("b", Err(RecognizeError::NoSpeech)),
        ])
    }

    fn sine(secs: f32, amplitude: f32) -> AudioBuffer {
        let n = (secs * TARGET_SAMPLE_RATE as f32) as usize;
        let samples = (0..n)
            .map(|i| {
                let t = i as f32 / TARGET_SAMPLE_RATE as f32;
                amplitude * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
            })
            .collect();
        AudioBuffer::new(samples, TARGET_SAMPLE_RATE).expect("valid buffer")
    }

    #[test]
    fn provenance_serializes_as_tag() {
        assert_eq!(serde_json::to_string(&Provenance::Primary).unwrap(), "\"primary\"");
        assert_eq!(
            serde_json::to_string(&Provenance::for_attempt(3)).unwrap(),
            "\"fallback-3\""
        );
        assert_eq!(Provenance::Diagnostic.to_string(), "diagnostic");
    }

    #[tokio::test]
    async fn first_success_wins_and_failures_are_kept() {
        let engine = TranscriptionEngine::new(vec![
            scripted("a", Err(RecognizeError::Unavailable("503".into()))),
            scripted("b", Err(RecognizeError::NoSpeech)),
            scripted("c", Ok(Recognition::text("hello there"))),
            scripted("d", Ok(Recognition::text("never reached"))),
        ]);
        let result = engine.transcribe(&sine(2.0, 0.3)).await;
        assert_eq!(result.text, "hello there");
        assert_eq!(result.provenance, Provenance::Fallback(3));
        assert_eq!(result.failures.len(), 2);
        assert_eq!(result.failures[0].kind, FailureKind::Unavailable);
        assert_eq!(result.failures[1].kind, FailureKind::NoSpeech);
        assert!(result.diagnosis.is_none());
    }

    #[tokio::test]
    async fn blank_transcript_counts_as_no_speech() {
        let engine = TranscriptionEngine::new(vec![
            scripted("blank", Ok(Recognition::text("   "))),
            scripted("ok", Ok(Recognition::text("fine"))),
        ]);
        let result = engine.transcribe(&sine(2.0, 0.3)).await;
        assert_eq!(result.provenance, Provenance::Fallback(2));
        assert_eq!(result.failures[0].kind, FailureKind::NoSpeech);
    }

    #[tokio::test]
    async fn panicking_recognizer_is_isolated() {
        let engine = TranscriptionEngine::new(vec![
            Arc::new(Exploding),
            scripted("ok", Ok(Recognition::text("recovered"))),
        ]);
        let result = engine.transcribe(&sine(2.0, 0.3)).await;
        assert_eq!(result.text, "recovered");
        assert_eq!(result.failures[0].kind, FailureKind::Unexpected);
        assert!(result.failures[0].reason.contains("malformed reply"));
    }

    #[tokio::test]
    async fn short_clip_gets_too_short_placeholder() {
        let result = failing_engine().transcribe(&sine(0.5, 0.3)).await;
        assert_eq!(result.provenance, Provenance::Diagnostic);
        assert_eq!(result.diagnosis, Some(SignalDiagnosis::TooShort));
        assert_eq!(result.text, SignalDiagnosis::TooShort.placeholder());
        assert_eq!(result.failures.len(), 2);
    }

    #[tokio::test]
    async fn silence_gets_too_quiet_placeholder() {
        let silence = AudioBuffer::silence(Duration::from_secs(2));
        let result = failing_engine().transcribe(&silence).await;
        assert_eq!(result.diagnosis, Some(SignalDiagnosis::TooQuiet));
    }

    #[tokio::test]
    async fn audible_clip_gets_not_detected_placeholder() {
        let result = failing_engine().transcribe(&sine(2.0, 0.3)).await;
        assert_eq!(result.diagnosis, Some(SignalDiagnosis::NotDetected));
        assert!(!result.text.is_empty());
    }

    #[tokio::test]
    async fn no_attempts_still_yields_text() {
        let engine = TranscriptionEngine::new(Vec::new());
        let result = engine.transcribe(&sine(2.0, 0.3)).await;
        assert_eq!(result.provenance, Provenance::Diagnostic);
        assert!(result.failures.is_empty());
    }

    #[test]
    fn from_config_builds_three_remote_attempts() {
        use crate::config::{parse_endpoint, ApiKey, DEFAULT_RECOGNIZER_URL};
        let cfg = RecognitionConfig::new(
            parse_endpoint(DEFAULT_RECOGNIZER_URL).unwrap(),
            Some(ApiKey::new("k").unwrap()),
        );
        let engine = TranscriptionEngine::from_config(&cfg).unwrap();
        assert_eq!(
            engine.recognizer_names(),
            vec!["remote:en-US", "remote-envelope:en-US", "remote:en-GB"]
        );
    }
}
