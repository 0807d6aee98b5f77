use super::{Recognition, RecognizeError, Recognizer};
use crate::config::{ApiKey, Locale};
use crate::decode::AudioBuffer;
use crate::util::{is_http_retryable, retry_with_backoff, RetryConfig};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const LOG_TARGET: &str = "asr::remote";

/// How much of the recognizer's reply to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseMode {
    /// The first alternative's transcript only.
    BestText,
    /// The highest-confidence alternative, with its confidence.
    FullEnvelope,
}

/// Client for a web speech recognizer that takes raw 16-bit big-endian PCM and answers with
/// newline-delimited JSON result envelopes.
#[derive(Clone)]
pub struct RemoteRecognizer {
    client: Client,
    endpoint: Url,
    api_key: Option<ApiKey>,
    locale: Locale,
    mode: ResponseMode,
    retry: RetryConfig,
    name: String,
}

impl RemoteRecognizer {
    pub fn new(
        client: Client,
        endpoint: Url,
        api_key: Option<ApiKey>,
        locale: Locale,
        mode: ResponseMode,
    ) -> Self {
        let prefix = match mode {
            ResponseMode::BestText => "remote",
            ResponseMode::FullEnvelope => "remote-envelope",
        };
        let name = format!("{prefix}:{}", locale.as_str());
        Self {
            client,
            endpoint,
            api_key,
            locale,
            mode,
            retry: RetryConfig::once(),
            name,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn request_url(&self, key: &ApiKey) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client", "chromium")
            .append_pair("lang", self.locale.as_str())
            .append_pair("key", key.expose())
            .append_pair("pFilter", "0");
        url
    }

    async fn post_once(&self, url: Url, body: Bytes, content_type: &str) -> reqwest::Result<String> {
        self.client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

impl Recognizer for RemoteRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize<'a>(
        &'a self,
        audio: &'a AudioBuffer,
    ) -> BoxFuture<'a, Result<Recognition, RecognizeError>> {
        async move {
            let key = self.api_key.as_ref().ok_or_else(|| {
                RecognizeError::Unavailable("no recognizer key configured".to_owned())
            })?;
            let url = self.request_url(key);
            let body = Bytes::from(pcm_l16_be(audio));
            let content_type = format!("audio/l16; rate={};", audio.sample_rate());

            tracing::debug!(
                target: LOG_TARGET,
                recognizer = %self.name,
                bytes = body.len(),
                "sending audio to recognizer"
            );

            let reply = retry_with_backoff(
                &self.retry,
                || self.post_once(url.clone(), body.clone(), &content_type),
                |e: &reqwest::Error| e.status().is_none_or(|s| is_http_retryable(s.as_u16())),
            )
            .await
            .map_err(|e| match e.status() {
                Some(status) => RecognizeError::Unavailable(format!("HTTP {status}")),
                None => RecognizeError::Unavailable(e.to_string()),
            })?;

            parse_reply(&reply, self.mode)
        }
        .boxed()
    }
}

fn pcm_l16_be(audio: &AudioBuffer) -> Vec<u8> {
    audio
        .to_i16()
        .into_iter()
        .flat_map(i16::to_be_bytes)
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Vec<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    alternative: Vec<Alternative>,
}

#[derive(Clone, Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
    confidence: Option<f32>,
}

/// Picks a transcript out of a newline-delimited reply; the first non-empty result set counts.
fn parse_reply(reply: &str, mode: ResponseMode) -> Result<Recognition, RecognizeError> {
    let mut alternatives = None;
    for line in reply.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let envelope: Envelope = serde_json::from_str(line)
            .map_err(|e| RecognizeError::Unexpected(format!("malformed reply: {e}")))?;
        if let Some(set) = envelope
            .result
            .into_iter()
            .find(|set| !set.alternative.is_empty())
        {
            alternatives = Some(set.alternative);
            break;
        }
    }

    let alternatives = alternatives.ok_or(RecognizeError::NoSpeech)?;
    let chosen = match mode {
        ResponseMode::BestText => alternatives.into_iter().next().map(|alt| Recognition {
            text: alt.transcript,
            confidence: None,
        }),
        ResponseMode::FullEnvelope => alternatives
            .into_iter()
            .max_by(|a, b| {
                a.confidence
                    .unwrap_or(0.0)
                    .total_cmp(&b.confidence.unwrap_or(0.0))
            })
            .map(|alt| Recognition {
                text: alt.transcript,
                confidence: alt.confidence.map(|c| c.clamp(0.0, 1.0)),
            }),
    };

    match chosen {
        Some(r) if !r.text.trim().is_empty() => Ok(r),
        _ => Err(RecognizeError::NoSpeech),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_endpoint, DEFAULT_RECOGNIZER_URL};

    const REPLY: &str = r#"{"result":[]}
{"result":[{"alternative":[{"transcript":"i am fine","confidence":0.61},{"transcript":"i am find","confidence":0.87},{"transcript":"am fine"}],"final":true}],"result_index":0}
"#;

    #[test]
    fn best_text_takes_first_alternative() {
        let r = parse_reply(REPLY, ResponseMode::BestText).unwrap();
        assert_eq!(r.text, "i am fine");
        assert_eq!(r.confidence, None);
    }

    #[test]
    fn envelope_takes_highest_confidence() {
        let r = parse_reply(REPLY, ResponseMode::FullEnvelope).unwrap();
        assert_eq!(r.text, "i am find");
        assert_eq!(r.confidence, Some(0.87));
    }

    #[test]
    fn empty_results_mean_no_speech() {
        let err = parse_reply("{\"result\":[]}\n", ResponseMode::BestText).unwrap_err();
        assert_eq!(err, RecognizeError::NoSpeech);
        assert_eq!(parse_reply("", ResponseMode::BestText).unwrap_err(), RecognizeError::NoSpeech);
    }

    #[test]
    fn garbage_reply_is_unexpected() {
        let err = parse_reply("<html>quota</html>", ResponseMode::BestText).unwrap_err();
        assert!(matches!(err, RecognizeError::Unexpected(_)));
    }

    #[test]
    fn request_url_carries_locale_and_key() {
        let rec = RemoteRecognizer::new(
            Client::new(),
            parse_endpoint(DEFAULT_RECOGNIZER_URL).unwrap(),
            Some(ApiKey::new("abc").unwrap()),
            Locale::new("en-GB").unwrap(),
            ResponseMode::BestText,
        );
        let url = rec.request_url(&ApiKey::new("abc").unwrap());
        let query = url.query().unwrap_or_default();
        assert!(query.contains("lang=en-GB"));
        assert!(query.contains("key=abc"));
        assert!(query.contains("client=chromium"));
        assert_eq!(rec.name(), "remote:en-GB");
    }

    #[test]
    fn pcm_is_big_endian() {
        let audio = AudioBuffer::new(vec![0.5, -0.5], 16_000).unwrap();
        let bytes = pcm_l16_be(&audio);
        assert_eq!(bytes.len(), 4);
        let first = i16::from_be_bytes([bytes[0], bytes[1]]);
        assert!((first - 16_384).abs() <= 1);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let rec = RemoteRecognizer::new(
            Client::new(),
            parse_endpoint("http://127.0.0.1:9/recognize").unwrap(),
            Some(ApiKey::new("abc").unwrap()),
            Locale::default(),
            ResponseMode::BestText,
        );
        let audio = AudioBuffer::new(vec![0.1; 1_600], 16_000).unwrap();
        let err = rec.recognize(&audio).await.unwrap_err();
        assert!(matches!(err, RecognizeError::Unavailable(_)));
    }

    #[tokio::test]
    async fn missing_key_is_unavailable_without_a_request() {
        // Port 9 would fail too; the message shows no connection was tried.
        let rec = RemoteRecognizer::new(
            Client::new(),
            parse_endpoint("http://127.0.0.1:9/recognize").unwrap(),
            None,
            Locale::default(),
            ResponseMode::FullEnvelope,
        );
        let audio = AudioBuffer::new(vec![0.1; 1_600], 16_000).unwrap();
        let err = rec.recognize(&audio).await.unwrap_err();
        assert_eq!(
            err,
            RecognizeError::Unavailable("no recognizer key configured".to_owned())
        );
    }
}
