use super::{Recognition, RecognizeError, Recognizer};
use crate::config::LocalWhisperConfig;
use crate::decode::AudioBuffer;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

const LOG_TARGET: &str = "asr::local";

/// Offline recognizer backed by an OpenAI-compatible transcription server
/// (whisper.cpp server, faster-whisper, ...) reachable on the local network.
#[derive(Clone)]
pub struct LocalWhisperRecognizer {
    client: Client,
    config: LocalWhisperConfig,
}

#[derive(Debug, Deserialize)]
struct TranscriptionReply {
    text: String,
}

impl LocalWhisperRecognizer {
    pub fn new(client: Client, config: LocalWhisperConfig) -> Self {
        Self { client, config }
    }

    fn form(&self, wav: Vec<u8>) -> Result<Form, RecognizeError> {
        let part = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| RecognizeError::Unexpected(e.to_string()))?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone());
        if let Some(language) = &self.config.language {
            form = form.text("language", language.clone());
        }
        Ok(form)
    }
}

impl Recognizer for LocalWhisperRecognizer {
    fn name(&self) -> &str {
        "local-whisper"
    }

    fn recognize<'a>(
        &'a self,
        audio: &'a AudioBuffer,
    ) -> BoxFuture<'a, Result<Recognition, RecognizeError>> {
        async move {
            let wav = audio
                .to_wav_bytes()
                .map_err(|e| RecognizeError::Unexpected(format!("wav encode failed: {e}")))?;
            let form = self.form(wav)?;

            tracing::debug!(target: LOG_TARGET, endpoint = %self.config.endpoint, "uploading clip");

            let response = self
                .client
                .post(self.config.endpoint.clone())
                .multipart(form)
                .send()
                .await
                .map_err(|e| RecognizeError::Unavailable(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(RecognizeError::Unavailable(format!("HTTP {status}: {body}")));
            }

            let reply: TranscriptionReply = response
                .json()
                .await
                .map_err(|e| RecognizeError::Unexpected(format!("malformed reply: {e}")))?;

            let text = reply.text.trim();
            if text.is_empty() {
                return Err(RecognizeError::NoSpeech);
            }
            Ok(Recognition::text(text))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_endpoint;

    fn recognizer(endpoint: &str) -> LocalWhisperRecognizer {
        LocalWhisperRecognizer::new(
            Client::new(),
            LocalWhisperConfig {
                endpoint: parse_endpoint(endpoint).unwrap(),
                model: "whisper-1".to_owned(),
                language: Some("en".to_owned()),
            },
        )
    }

    #[test]
    fn reply_parses_text_field() {
        let reply: TranscriptionReply =
            serde_json::from_str(r#"{"text":" hello ","language":"en"}"#).unwrap();
        assert_eq!(reply.text.trim(), "hello");
    }

    #[test]
    fn form_builds_with_language() {
        assert!(recognizer("http://127.0.0.1:8080/v1/audio/transcriptions")
            .form(vec![0u8; 44])
            .is_ok());
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        let rec = recognizer("http://127.0.0.1:9/v1/audio/transcriptions");
        let audio = AudioBuffer::new(vec![0.1; 1_600], 16_000).unwrap();
        let err = rec.recognize(&audio).await.unwrap_err();
        assert!(matches!(err, RecognizeError::Unavailable(_)));
    }
}
