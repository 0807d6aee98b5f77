use anyhow::Context;
use calmpulse_core::broadcast::Broadcaster;
use calmpulse_core::config::{
    parse_endpoint, resolve_api_key, resolve_endpoint, resolve_optional_string, AppConfig, Env,
    FeatureDefaults, Locale, LocalWhisperConfig, NormalizerConfig, RecognitionConfig, StdEnv,
    WindowSize, DEFAULT_ALTERNATE_LOCALE, DEFAULT_JOURNAL_PATH, DEFAULT_PRIMARY_LOCALE,
    DEFAULT_RECOGNIZER_RETRIES, DEFAULT_RECOGNIZER_URL, DEFAULT_WHISPER_MODEL, ENV_JOURNAL_PATH,
    ENV_RECOGNIZER_KEY, ENV_RECOGNIZER_URL, ENV_WHISPER_URL,
};
use calmpulse_core::decode::AudioUpload;
use calmpulse_core::emotion::{HeartRateSeries, Vitals, VolumeSeries};
use calmpulse_core::journal::JsonJournal;
use calmpulse_core::pipeline::{EmotionPipeline, WindowReport};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "calmpulse")]
#[command(about = "Estimate emotional state from speech, heart rate and loudness")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Remote speech recognizer endpoint.
    #[arg(long, global = true)]
    recognizer_url: Option<String>,

    /// Key for the remote recognizer; remote attempts are skipped as unavailable without one.
    #[arg(long, global = true)]
    recognizer_key: Option<String>,

    #[arg(long, global = true, default_value = DEFAULT_PRIMARY_LOCALE)]
    locale: String,

    #[arg(long, global = true, default_value = DEFAULT_ALTERNATE_LOCALE)]
    alt_locale: String,

    #[arg(long, global = true, default_value_t = DEFAULT_RECOGNIZER_RETRIES)]
    recognizer_retries: u32,

    /// Per-request timeout for recognizers; unbounded when omitted.
    #[arg(long, global = true)]
    recognizer_timeout_secs: Option<u64>,

    /// OpenAI-compatible transcription endpoint used as the last recognizer.
    #[arg(long, global = true)]
    whisper_url: Option<String>,

    #[arg(long, global = true, default_value = DEFAULT_WHISPER_MODEL)]
    whisper_model: String,

    #[arg(long, global = true)]
    whisper_language: Option<String>,

    /// Try an external ffmpeg transcode when in-process decoding fails.
    #[arg(long, global = true)]
    ffmpeg: bool,

    #[arg(long, global = true)]
    ffmpeg_auto_download: bool,

    #[arg(long, global = true)]
    journal: Option<PathBuf>,

    #[arg(long, global = true)]
    no_journal: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one audio clip.
    Analyze {
        file: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
        #[command(flatten)]
        vitals: VitalsArgs,
    },
    /// Score a transcript without audio.
    Score {
        #[arg(long)]
        text: String,
        #[command(flatten)]
        vitals: VitalsArgs,
    },
    /// Analyze a long recording window by window.
    Stream {
        file: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
        /// Window length in seconds [default: 10]
        #[arg(long)]
        window_secs: Option<u64>,
        #[command(flatten)]
        vitals: VitalsArgs,
    },
    /// Analyze the default microphone window by window until stopped.
    #[cfg(feature = "mic")]
    Listen {
        /// Window length in seconds [default: 10]
        #[arg(long)]
        window_secs: Option<u64>,
        /// Stop after this many seconds; runs until Ctrl-C when omitted.
        #[arg(long)]
        duration_secs: Option<u64>,
        #[command(flatten)]
        vitals: VitalsArgs,
    },
}

#[derive(Args, Debug)]
struct VitalsArgs {
    /// JSON array of {"timestamp", "bpm"} readings.
    #[arg(long)]
    heart_rate: Option<PathBuf>,

    /// JSON array of {"index", "volume"} readings.
    #[arg(long)]
    volume: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let env = StdEnv;
    let cfg = build_config(&cli, &env)?;
    if cfg.recognition.api_key.is_none() {
        tracing::warn!("no recognizer key set; only local recognition and placeholders will run");
    }
    tracing::info!(
        recognizer = %cfg.recognition.endpoint,
        locale = cfg.recognition.primary_locale.as_str(),
        local_whisper = cfg.recognition.local_whisper.is_some(),
        ffmpeg = cfg.normalizer.use_ffmpeg,
        "config loaded"
    );

    let pipeline = EmotionPipeline::from_config(&cfg).context("failed to set up recognizers")?;
    let journal = cfg.journal.clone().map(JsonJournal::new);

    match cli.command {
        Command::Analyze {
            file,
            content_type,
            vitals,
        } => {
            let vitals = vitals.load().await?;
            let upload = read_upload(&file, content_type).await?;
            let report = pipeline
                .analyze_audio(&upload, &vitals)
                .await
                .with_context(|| format!("cannot analyze {}", file.display()))?;
            record(journal.as_ref(), &report);
            print_json(&report)?;
        }
        Command::Score { text, vitals } => {
            let vitals = vitals.load().await?;
            let report = pipeline.score_transcript(&text, &vitals);
            record(journal.as_ref(), &report);
            print_json(&report)?;
        }
        Command::Stream {
            file,
            content_type,
            window_secs,
            vitals,
        } => {
            let vitals = vitals.load().await?;
            let upload = read_upload(&file, content_type).await?;
            let window = match window_secs {
                Some(secs) => WindowSize::new(secs)?,
                None => cfg.window,
            };
            run_stream(&pipeline, &upload, &vitals, window, journal).await?;
        }
        #[cfg(feature = "mic")]
        Command::Listen {
            window_secs,
            duration_secs,
            vitals,
        } => {
            let vitals = vitals.load().await?;
            let window = match window_secs {
                Some(secs) => WindowSize::new(secs)?,
                None => cfg.window,
            };
            run_listen(&pipeline, &vitals, window, duration_secs, journal).await?;
        }
    }

    Ok(())
}

async fn run_stream(
    pipeline: &EmotionPipeline,
    upload: &AudioUpload,
    vitals: &Vitals,
    window: WindowSize,
    journal: Option<JsonJournal>,
) -> anyhow::Result<()> {
    let hub: Broadcaster<WindowReport> = Broadcaster::default();
    let consumers = spawn_consumers(&hub, journal).await;

    let summary = pipeline
        .analyze_stream(upload, vitals, window, &hub)
        .await
        .context("stream analysis failed")?;
    drop(hub);
    join_consumers(consumers).await?;

    tracing::info!(
        windows = summary.windows,
        source_strategy = summary.source_strategy,
        "stream complete"
    );
    Ok(())
}

#[cfg(feature = "mic")]
async fn run_listen(
    pipeline: &EmotionPipeline,
    vitals: &Vitals,
    window: WindowSize,
    duration_secs: Option<u64>,
    journal: Option<JsonJournal>,
) -> anyhow::Result<()> {
    use calmpulse_core::capture::{MicCapture, DEFAULT_BLOCK_CAPACITY};

    let (capture, blocks) =
        MicCapture::start(DEFAULT_BLOCK_CAPACITY).context("cannot open microphone")?;
    let rate = capture.sample_rate();
    let hub: Broadcaster<WindowReport> = Broadcaster::default();
    let consumers = spawn_consumers(&hub, journal).await;

    let analysis = pipeline.analyze_live(blocks, rate, vitals, window, &hub);
    tokio::pin!(analysis);
    let stop = async {
        match duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            }
        }
    };

    let summary = tokio::select! {
        res = &mut analysis => res,
        _ = stop => {
            tracing::info!("stopping microphone");
            capture.stop();
            analysis.await
        }
    }
    .context("live analysis failed")?;
    drop(hub);
    join_consumers(consumers).await?;

    tracing::info!(windows = summary.windows, "listen complete");
    Ok(())
}

/// Prints every window report as a JSON line and, when enabled, journals each one.
async fn spawn_consumers(
    hub: &Broadcaster<WindowReport>,
    journal: Option<JsonJournal>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut printer_rx = hub.subscribe().await;
    let mut tasks = vec![tokio::spawn(async move {
        while let Some(report) = printer_rx.recv().await {
            match serde_json::to_string(&report) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "cannot serialize window report"),
            }
        }
    })];

    if let Some(journal) = journal {
        let mut rx = hub.subscribe_lossless().await;
        tasks.push(tokio::spawn(async move {
            while let Some(report) = rx.recv().await {
                record(Some(&journal), &report);
            }
        }));
    }
    tasks
}

async fn join_consumers(tasks: Vec<tokio::task::JoinHandle<()>>) -> anyhow::Result<()> {
    for task in tasks {
        task.await.context("report consumer failed")?;
    }
    Ok(())
}

impl VitalsArgs {
    async fn load(&self) -> anyhow::Result<Vitals> {
        let heart_rate: HeartRateSeries = match &self.heart_rate {
            Some(path) => read_json(path).await?,
            None => HeartRateSeries::default(),
        };
        let volume: VolumeSeries = match &self.volume {
            Some(path) => read_json(path).await?,
            None => VolumeSeries::default(),
        };
        Ok(Vitals { heart_rate, volume })
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

async fn read_upload(path: &Path, content_type: Option<String>) -> anyhow::Result<AudioUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut upload = AudioUpload::new(bytes);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        upload = upload.with_file_name(name);
    }
    if let Some(ct) = content_type {
        upload = upload.with_content_type(ct);
    }
    Ok(upload)
}

/// Journal failures are logged, never fatal to the analysis.
fn record<T: Serialize>(journal: Option<&JsonJournal>, report: &T) {
    let Some(journal) = journal else {
        return;
    };
    if let Err(e) = journal.append(report) {
        tracing::warn!(path = %journal.path().display(), error = %e, "journal append failed");
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(cli: &Cli, env: &impl Env) -> anyhow::Result<AppConfig> {
    let endpoint = resolve_endpoint(
        cli.recognizer_url.clone(),
        ENV_RECOGNIZER_URL,
        env,
        DEFAULT_RECOGNIZER_URL,
    )?;
    let api_key = resolve_api_key(cli.recognizer_key.clone(), ENV_RECOGNIZER_KEY, env)?;

    let mut recognition = RecognitionConfig::new(endpoint, api_key);
    recognition.primary_locale = Locale::new(cli.locale.clone())?;
    recognition.alternate_locale = Locale::new(cli.alt_locale.clone())?;
    recognition.retries = cli.recognizer_retries;
    recognition.request_timeout = cli.recognizer_timeout_secs.map(Duration::from_secs);

    if let Some(url) = resolve_optional_string(cli.whisper_url.clone(), ENV_WHISPER_URL, env) {
        recognition.local_whisper = Some(LocalWhisperConfig {
            endpoint: parse_endpoint(&url)?,
            model: cli.whisper_model.clone(),
            language: cli.whisper_language.clone(),
        });
    }

    let journal = if cli.no_journal {
        None
    } else {
        let path = cli
            .journal
            .clone()
            .or_else(|| env.var(ENV_JOURNAL_PATH).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JOURNAL_PATH));
        Some(path)
    };

    Ok(AppConfig {
        recognition,
        normalizer: NormalizerConfig {
            use_ffmpeg: cli.ffmpeg,
            ffmpeg_auto_download: cli.ffmpeg_auto_download,
        },
        features: FeatureDefaults::default(),
        window: WindowSize::default(),
        journal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use calmpulse_core::config::MapEnv;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid args")
    }

    #[test]
    fn defaults_resolve_to_builtin_recognizer() {
        let cli = parse(&["calmpulse", "score", "--text", "hello"]);
        let cfg = build_config(&cli, &MapEnv::default()).unwrap();
        assert_eq!(cfg.recognition.endpoint.as_str(), DEFAULT_RECOGNIZER_URL);
        assert_eq!(cfg.recognition.alternate_locale.as_str(), "en-GB");
        assert!(cfg.recognition.request_timeout.is_none());
        assert!(cfg.recognition.local_whisper.is_none());
        assert!(cfg.recognition.api_key.is_none());
        assert_eq!(cfg.journal, Some(PathBuf::from(DEFAULT_JOURNAL_PATH)));
    }

    #[test]
    fn env_supplies_whisper_and_journal() {
        let env = MapEnv::default()
            .with_var(ENV_WHISPER_URL, "http://127.0.0.1:8080/v1/audio/transcriptions")
            .with_var(ENV_JOURNAL_PATH, "/tmp/calm.json");
        let cli = parse(&["calmpulse", "analyze", "clip.wav", "--recognizer-timeout-secs", "5"]);
        let cfg = build_config(&cli, &env).unwrap();
        assert_eq!(
            cfg.recognition.local_whisper.map(|w| w.model),
            Some(DEFAULT_WHISPER_MODEL.to_owned())
        );
        assert_eq!(cfg.recognition.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(cfg.journal, Some(PathBuf::from("/tmp/calm.json")));
    }

    #[test]
    fn recognizer_key_comes_from_env() {
        let env = MapEnv::default().with_var(ENV_RECOGNIZER_KEY, "from-env");
        let cli = parse(&["calmpulse", "score", "--text", "x"]);
        let cfg = build_config(&cli, &env).unwrap();
        assert_eq!(
            cfg.recognition.api_key.map(|k| k.expose().to_owned()),
            Some("from-env".to_owned())
        );
    }

    #[test]
    fn no_journal_wins() {
        let cli = parse(&["calmpulse", "--no-journal", "score", "--text", "x"]);
        assert!(build_config(&cli, &MapEnv::default()).unwrap().journal.is_none());
    }

    #[test]
    fn stream_window_flag_parses() {
        let cli = parse(&["calmpulse", "stream", "long.wav", "--window-secs", "5"]);
        match cli.command {
            Command::Stream { window_secs, .. } => assert_eq!(window_secs, Some(5)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[cfg(feature = "mic")]
    #[test]
    fn listen_duration_flag_parses() {
        let cli = parse(&["calmpulse", "listen", "--duration-secs", "30"]);
        match cli.command {
            Command::Listen { duration_secs, .. } => assert_eq!(duration_secs, Some(30)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn blank_locale_is_rejected() {
        let cli = parse(&["calmpulse", "--locale", " ", "score", "--text", "x"]);
        assert!(build_config(&cli, &MapEnv::default()).is_err());
    }
}
