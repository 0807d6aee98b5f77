use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_PRIMARY_LOCALE: &str = "en-US";
pub const DEFAULT_ALTERNATE_LOCALE: &str = "en-GB";
pub const DEFAULT_RECOGNIZER_URL: &str = "http://www.google.com/speech-api/v2/recognize";
pub const DEFAULT_RECOGNIZER_RETRIES: u32 = 2;
pub const DEFAULT_WHISPER_MODEL: &str = "whisper-1";
pub const DEFAULT_WINDOW_SECS: u64 = 10;
pub const DEFAULT_JOURNAL_PATH: &str = "audio_log.json";
pub const ENV_RECOGNIZER_URL: &str = "CALMPULSE_RECOGNIZER_URL";
pub const ENV_RECOGNIZER_KEY: &str = "CALMPULSE_RECOGNIZER_KEY";
pub const ENV_WHISPER_URL: &str = "CALMPULSE_WHISPER_URL";
pub const ENV_JOURNAL_PATH: &str = "CALMPULSE_JOURNAL";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Locale(String);

impl Locale {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyLocale);
        }
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self(DEFAULT_PRIMARY_LOCALE.to_owned())
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

/// Length of the analysis window used when a long recording is processed as a stream.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowSize {
    pub secs: u64,
}

impl WindowSize {
    pub fn new(secs: u64) -> Result<Self, ConfigError> {
        if secs == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Self { secs })
    }

    pub fn frames_for_sample_rate(&self, sample_rate_hz: u32) -> usize {
        let frames = self.secs.saturating_mul(u64::from(sample_rate_hz));
        usize::try_from(frames).unwrap_or(usize::MAX)
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            secs: DEFAULT_WINDOW_SECS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecognitionConfig {
    pub endpoint: Url,
    /// Remote attempts report themselves unavailable without one.
    pub api_key: Option<ApiKey>,
    pub primary_locale: Locale,
    pub alternate_locale: Locale,
    /// Tries per remote attempt, including the first one.
    pub retries: u32,
    /// `None` keeps the remote call unbounded.
    pub request_timeout: Option<Duration>,
    pub local_whisper: Option<LocalWhisperConfig>,
}

impl RecognitionConfig {
    pub fn new(endpoint: Url, api_key: Option<ApiKey>) -> Self {
        Self {
            endpoint,
            api_key,
            primary_locale: Locale::default(),
            alternate_locale: Locale(DEFAULT_ALTERNATE_LOCALE.to_owned()),
            retries: DEFAULT_RECOGNIZER_RETRIES,
            request_timeout: None,
            local_whisper: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalWhisperConfig {
    pub endpoint: Url,
    pub model: String,
    pub language: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizerConfig {
    pub use_ffmpeg: bool,
    pub ffmpeg_auto_download: bool,
}

/// Values substituted when feature extraction produces a non-finite result.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FeatureDefaults {
    pub pitch_hz: f32,
    pub volume: f32,
}

impl Default for FeatureDefaults {
    fn default() -> Self {
        Self {
            pitch_hz: 0.0,
            volume: 0.5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub recognition: RecognitionConfig,
    pub normalizer: NormalizerConfig,
    pub features: FeatureDefaults,
    pub window: WindowSize,
    pub journal: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("locale must not be empty")]
    EmptyLocale,
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("analysis window must be > 0 s")]
    ZeroWindow,
    #[error("invalid endpoint {0}")]
    InvalidEndpoint(String),
}

pub fn parse_endpoint(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEndpoint(format!("{value}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidEndpoint(format!(
            "{value}: unsupported scheme {other}"
        ))),
    }
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// `None` when neither the flag nor the variable is set; a blank value is an error.
pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    resolve_optional_string(cli_value, env_key, env)
        .map(ApiKey::new)
        .transpose()
}

pub fn resolve_endpoint(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> Result<Url, ConfigError> {
    parse_endpoint(&resolve_string_with_default(cli_value, env_key, env, default))
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}
