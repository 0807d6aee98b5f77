use super::{validate_upload, AudioAnalysisReport, EmotionPipeline, PipelineError};
use crate::broadcast::Broadcaster;
use crate::config::WindowSize;
use crate::decode::{resample, AudioBuffer, AudioUpload, TARGET_SAMPLE_RATE};
use crate::emotion::Vitals;
use crate::util::WindowChunker;
use serde::Serialize;
use tokio::sync::mpsc;

const LOG_TARGET: &str = "pipeline::stream";

pub const STREAM_WINDOW_STRATEGY: &str = "stream-window";
pub const LIVE_SOURCE: &str = "live";
/// Trailing audio shorter than this is not worth a recognizer round-trip, unless it is
/// all there is.
const MIN_TAIL_SECS: f32 = 1.0;
/// Blocks fed to the chunker, mimicking capture callbacks.
const BLOCKS_PER_SEC: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WindowReport {
    pub window: usize,
    pub start_secs: f32,
    #[serde(flatten)]
    pub analysis: AudioAnalysisReport,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    pub windows: usize,
    pub deliveries: usize,
    pub source_strategy: &'static str,
}

impl EmotionPipeline {
    /// Cuts a recording into fixed windows, analyzes each one as it fills and broadcasts
    /// the per-window report.
    pub async fn analyze_stream(
        &self,
        upload: &AudioUpload,
        vitals: &Vitals,
        window: WindowSize,
        hub: &Broadcaster<WindowReport>,
    ) -> Result<StreamSummary, PipelineError> {
        validate_upload(upload)?;
        let normalized = self.normalizer.normalize(upload).await;
        let rate = normalized.buffer.sample_rate();
        let window_frames = window.frames_for_sample_rate(rate).max(1);
        let block = (rate as usize / BLOCKS_PER_SEC).max(1);

        let mut chunker = WindowChunker::new(window_frames);
        let mut summary = StreamSummary {
            windows: 0,
            deliveries: 0,
            source_strategy: normalized.strategy,
        };

        for samples in normalized.buffer.samples().chunks(block) {
            for ready in chunker.push(samples) {
                self.emit_window(ready, rate, window_frames, vitals, hub, &mut summary)
                    .await?;
            }
        }

        if let Some(tail) = chunker.finish() {
            if summary.windows == 0 || tail.len() as f32 >= MIN_TAIL_SECS * rate as f32 {
                self.emit_window(tail, rate, window_frames, vitals, hub, &mut summary)
                    .await?;
            } else {
                tracing::debug!(
                    target: LOG_TARGET,
                    samples = tail.len(),
                    "dropping short trailing window"
                );
            }
        }

        tracing::info!(
            target: LOG_TARGET,
            windows = summary.windows,
            deliveries = summary.deliveries,
            "stream finished"
        );
        Ok(summary)
    }

    /// Analyzes audio blocks as they arrive from a live source at `native_rate`.
    ///
    /// Each filled window is resampled to the recognizer rate before analysis. Runs until
    /// every sender is dropped; the remaining tail follows the same rule as recordings, and a
    /// source that closes without any audio is [`PipelineError::EmptyInput`].
    pub async fn analyze_live(
        &self,
        mut blocks: mpsc::Receiver<Vec<f32>>,
        native_rate: u32,
        vitals: &Vitals,
        window: WindowSize,
        hub: &Broadcaster<WindowReport>,
    ) -> Result<StreamSummary, PipelineError> {
        if native_rate == 0 {
            return Err(PipelineError::Processing(
                "live source reported a 0 Hz sample rate".to_owned(),
            ));
        }
        let native_frames = window.frames_for_sample_rate(native_rate).max(1);
        let window_frames = window.frames_for_sample_rate(TARGET_SAMPLE_RATE).max(1);
        let to_target = |samples: Vec<f32>| -> Result<Vec<f32>, PipelineError> {
            if native_rate == TARGET_SAMPLE_RATE {
                return Ok(samples);
            }
            resample(&samples, native_rate, TARGET_SAMPLE_RATE)
                .map_err(|e| PipelineError::Processing(e.to_string()))
        };

        let mut chunker = WindowChunker::new(native_frames);
        let mut summary = StreamSummary {
            windows: 0,
            deliveries: 0,
            source_strategy: LIVE_SOURCE,
        };
        tracing::info!(target: LOG_TARGET, native_rate, secs = window.secs, "live analysis started");

        while let Some(block) = blocks.recv().await {
            for ready in chunker.push(&block) {
                let samples = to_target(ready)?;
                self.emit_window(
                    samples,
                    TARGET_SAMPLE_RATE,
                    window_frames,
                    vitals,
                    hub,
                    &mut summary,
                )
                .await?;
            }
        }

        if let Some(tail) = chunker.finish() {
            if summary.windows == 0 || tail.len() as f32 >= MIN_TAIL_SECS * native_rate as f32 {
                let samples = to_target(tail)?;
                self.emit_window(
                    samples,
                    TARGET_SAMPLE_RATE,
                    window_frames,
                    vitals,
                    hub,
                    &mut summary,
                )
                .await?;
            }
        }
        if summary.windows == 0 {
            return Err(PipelineError::EmptyInput);
        }

        tracing::info!(
            target: LOG_TARGET,
            windows = summary.windows,
            deliveries = summary.deliveries,
            "live source closed"
        );
        Ok(summary)
    }

    async fn emit_window(
        &self,
        samples: Vec<f32>,
        rate: u32,
        window_frames: usize,
        vitals: &Vitals,
        hub: &Broadcaster<WindowReport>,
        summary: &mut StreamSummary,
    ) -> Result<(), PipelineError> {
        let index = summary.windows;
        let buffer =
            AudioBuffer::new(samples, rate).map_err(|e| PipelineError::Processing(e.to_string()))?;
        let analysis = self.analyze_buffer(buffer, vitals).await?;
        let report = WindowReport {
            window: index,
            start_secs: (index * window_frames) as f32 / rate as f32,
            analysis,
        };
        summary.windows += 1;
        summary.deliveries += hub.broadcast(&report).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::{Recognition, Recognizer, RecognizeError, TranscriptionEngine};
    use crate::decode::{encode_wav_i16, Normalizer, TARGET_SAMPLE_RATE};
    use crate::emotion::EmotionLabel;
    use crate::features::FeatureExtractor;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::Arc;

    struct Cheerful;

    impl Recognizer for Cheerful {
        fn name(&self) -> &str {
            "cheerful"
        }

        fn recognize<'a>(
            &'a self,
            _audio: &'a AudioBuffer,
        ) -> BoxFuture<'a, Result<Recognition, RecognizeError>> {
            async { Ok(Recognition::text("what a wonderful calm day")) }.boxed()
        }
    }

    fn upload(secs: f32) -> AudioUpload {
        let n = (secs * TARGET_SAMPLE_RATE as f32) as usize;
        let samples: Vec<i16> = (0..n).map(|i| ((i % 64) as i16 - 32) * 200).collect();
        AudioUpload::new(encode_wav_i16(&samples, TARGET_SAMPLE_RATE, 1).unwrap())
            .with_file_name("session.wav")
    }

    fn pipeline() -> EmotionPipeline {
        EmotionPipeline::new(
            Normalizer::default(),
            TranscriptionEngine::new(vec![Arc::new(Cheerful)]),
            FeatureExtractor::default(),
        )
    }

    #[tokio::test]
    async fn windows_are_broadcast_in_order() {
        let hub = Broadcaster::new(8);
        let mut rx = hub.subscribe().await;
        let summary = pipeline()
            .analyze_stream(
                &upload(2.5),
                &Vitals::default(),
                WindowSize::new(1).unwrap(),
                &hub,
            )
            .await
            .unwrap();

        // two full windows; the 0.5 s tail is dropped
        assert_eq!(summary.windows, 2);
        assert_eq!(summary.deliveries, 2);
        assert_eq!(summary.source_strategy, "direct");

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.window, 0);
        assert_eq!(second.window, 1);
        assert_eq!(second.start_secs, 1.0);
        assert_eq!(first.analysis.emotion.emotion, EmotionLabel::Happy);
        assert_eq!(first.analysis.normalization.strategy, STREAM_WINDOW_STRATEGY);
    }

    #[tokio::test]
    async fn long_tail_is_analyzed() {
        let hub = Broadcaster::new(8);
        let summary = pipeline()
            .analyze_stream(
                &upload(3.5),
                &Vitals::default(),
                WindowSize::new(2).unwrap(),
                &hub,
            )
            .await
            .unwrap();
        assert_eq!(summary.windows, 2);
        assert_eq!(summary.deliveries, 0);
    }

    fn tone_blocks(rate: u32, secs: f32, block: usize) -> Vec<Vec<f32>> {
        let n = (secs * rate as f32) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / rate as f32).sin() * 0.2)
            .collect();
        samples.chunks(block).map(<[f32]>::to_vec).collect()
    }

    #[tokio::test]
    async fn live_blocks_are_resampled_and_windowed() {
        let hub = Broadcaster::new(8);
        let mut rx = hub.subscribe().await;
        let (tx, blocks) = mpsc::channel(64);
        for block in tone_blocks(48_000, 2.2, 4_800) {
            tx.send(block).await.unwrap();
        }
        drop(tx);

        let summary = pipeline()
            .analyze_live(blocks, 48_000, &Vitals::default(), WindowSize::new(1).unwrap(), &hub)
            .await
            .unwrap();
        assert_eq!(summary.windows, 2);
        assert_eq!(summary.source_strategy, LIVE_SOURCE);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.window, 0);
        assert_eq!(second.start_secs, 1.0);
        let secs = first.analysis.normalization.duration_secs;
        assert!((secs - 1.0).abs() < 0.05, "window lasted {secs} s");
    }

    #[tokio::test]
    async fn live_rejects_zero_rate() {
        let hub = Broadcaster::new(8);
        let (_tx, blocks) = mpsc::channel(1);
        let err = pipeline()
            .analyze_live(blocks, 0, &Vitals::default(), WindowSize::default(), &hub)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Processing(_)));
    }

    #[tokio::test]
    async fn recording_shorter_than_a_tail_still_yields_one_window() {
        let hub = Broadcaster::new(8);
        let mut rx = hub.subscribe().await;
        let summary = pipeline()
            .analyze_stream(&upload(0.5), &Vitals::default(), WindowSize::default(), &hub)
            .await
            .unwrap();
        assert_eq!(summary.windows, 1);
        assert_eq!(summary.deliveries, 1);

        let only = rx.recv().await.unwrap();
        assert_eq!(only.window, 0);
        assert_eq!(only.start_secs, 0.0);
        assert!((only.analysis.normalization.duration_secs - 0.5).abs() < 1e-3);
    }

    #[tokio::test]
    async fn short_live_source_yields_one_window() {
        let hub = Broadcaster::new(8);
        let (tx, blocks) = mpsc::channel(16);
        for block in tone_blocks(16_000, 0.4, 1_600) {
            tx.send(block).await.unwrap();
        }
        drop(tx);
        let summary = pipeline()
            .analyze_live(blocks, 16_000, &Vitals::default(), WindowSize::default(), &hub)
            .await
            .unwrap();
        assert_eq!(summary.windows, 1);
    }

    #[tokio::test]
    async fn silent_live_source_is_empty_input() {
        let hub = Broadcaster::new(8);
        let (tx, blocks) = mpsc::channel::<Vec<f32>>(1);
        drop(tx);
        let err = pipeline()
            .analyze_live(blocks, 16_000, &Vitals::default(), WindowSize::default(), &hub)
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::EmptyInput);
    }

    #[tokio::test]
    async fn stream_rejects_empty_upload() {
        let hub = Broadcaster::new(8);
        let err = pipeline()
            .analyze_stream(
                &AudioUpload::new(Vec::new()).with_file_name("x.wav"),
                &Vitals::default(),
                WindowSize::default(),
                &hub,
            )
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::EmptyInput);
    }
}
