use super::{
    AudioBuffer, DecodeError, DecodeSource, NormalizeStrategy, Result, TARGET_SAMPLE_RATE,
};
use bytes::Bytes;
use ffmpeg_sidecar::{command::ffmpeg_is_installed, download, paths::ffmpeg_path};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::process::Stdio;

/// Transcodes through an external ffmpeg for codecs the in-process decoder cannot read.
///
/// Reads the spooled temp file when there is one, so containers that need seeking
/// (MP4 with a trailing `moov` atom) decode correctly.
#[derive(Clone, Debug)]
pub struct FfmpegDecode {
    auto_download: bool,
}

impl FfmpegDecode {
    pub fn new(auto_download: bool) -> Self {
        Self { auto_download }
    }

    fn ensure_ffmpeg_available(&self) -> Result<()> {
        if ffmpeg_is_installed() {
            return Ok(());
        }
        if !self.auto_download {
            return Err(DecodeError::FfmpegUnavailable(
                "ffmpeg not found and auto-download disabled".to_owned(),
            ));
        }
        download::auto_download().map_err(|e| DecodeError::FfmpegUnavailable(e.to_string()))
    }

    fn parse_f32le_mono(raw: &[u8]) -> Result<Vec<f32>> {
        if !raw.len().is_multiple_of(4usize) {
            return Err(DecodeError::InvalidPcm(format!(
                "f32le byte length must be multiple of 4, got {}",
                raw.len()
            )));
        }
        let mut out = Vec::with_capacity(raw.len() / 4);
        for chunk in raw.chunks_exact(4) {
            out.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        Ok(out)
    }

    async fn transcode(&self, source: &DecodeSource) -> Result<Vec<f32>> {
        let input = match source.path() {
            Some(path) => path.to_string_lossy().into_owned(),
            None => "pipe:0".to_owned(),
        };
        let piped = source.path().is_none();
        let rate = TARGET_SAMPLE_RATE.to_string();

        let mut child = tokio::process::Command::new(ffmpeg_path())
            .args([
                "-hide_banner",
                "-nostdin",
                "-loglevel",
                "error",
                "-i",
                input.as_str(),
                "-vn",
                "-sn",
                "-dn",
                "-ac",
                "1",
                "-ar",
                rate.as_str(),
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "pipe:1",
            ])
            .stdin(if piped { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?;

        let stdin_task = child.stdin.take().map(|mut stdin| {
            let bytes: Bytes = source.bytes().clone();
            tokio::spawn(async move {
                use tokio::io::AsyncWriteExt;
                stdin.write_all(&bytes).await?;
                stdin.shutdown().await?;
                Ok::<(), std::io::Error>(())
            })
        });

        let mut stdout = child.stdout.take().ok_or_else(|| {
            DecodeError::FfmpegFailed("ffmpeg stdout unavailable (pipe not created)".to_owned())
        })?;
        let mut stderr = child.stderr.take().ok_or_else(|| {
            DecodeError::FfmpegFailed("ffmpeg stderr unavailable (pipe not created)".to_owned())
        })?;

        let stdout_task = tokio::spawn(async move {
            use tokio::io::AsyncReadExt;
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).await?;
            Ok::<Vec<u8>, std::io::Error>(buf)
        });

        let stderr_task = tokio::spawn(async move {
            use tokio::io::AsyncReadExt;
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await?;
            Ok::<Vec<u8>, std::io::Error>(buf)
        });

        let status = child
            .wait()
            .await
            .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?;

        if let Some(task) = stdin_task {
            task.await
                .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?
                .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?;
        }

        let stdout_bytes = stdout_task
            .await
            .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?
            .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?;

        let stderr_bytes = stderr_task
            .await
            .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?
            .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?;

        if !status.success() {
            let stderr_s = String::from_utf8_lossy(&stderr_bytes).trim().to_owned();
            return Err(DecodeError::FfmpegFailed(format!(
                "exit_code={:?} stderr={stderr_s}",
                status.code()
            )));
        }

        Self::parse_f32le_mono(&stdout_bytes)
    }
}

impl NormalizeStrategy for FfmpegDecode {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn normalize<'a>(&'a self, source: &'a DecodeSource) -> BoxFuture<'a, Result<AudioBuffer>> {
        async move {
            self.ensure_ffmpeg_available()?;
            let samples = self.transcode(source).await?;
            AudioBuffer::new(samples, TARGET_SAMPLE_RATE)
        }
        .boxed()
    }
}
