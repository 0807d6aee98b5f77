//! Live microphone input through the default cpal host.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

const LOG_TARGET: &str = "capture";

pub const DEFAULT_BLOCK_CAPACITY: usize = 256;

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("no default input device")]
    NoInputDevice,
    #[error("input config unavailable: {0}")]
    Config(String),
    #[error("unsupported sample format {0}")]
    UnsupportedFormat(String),
    #[error("failed to build input stream: {0}")]
    Build(String),
    #[error("failed to start input stream: {0}")]
    Play(String),
    #[error("capture thread exited before the stream started")]
    ThreadExited,
}

/// A running microphone stream.
///
/// The cpal stream lives on its own thread; mono `f32` blocks at [`MicCapture::sample_rate`]
/// arrive on the receiver returned by [`MicCapture::start`]. The receiver closes once the
/// capture is stopped or dropped.
pub struct MicCapture {
    sample_rate: u32,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MicCapture {
    pub fn start(capacity: usize) -> Result<(Self, mpsc::Receiver<Vec<f32>>), CaptureError> {
        let (block_tx, block_rx) = mpsc::channel(capacity.max(1));
        let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<u32, CaptureError>>(1);
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let thread = std::thread::spawn(move || {
            let stream = match open_default_input(block_tx) {
                Ok((stream, rate)) => {
                    let _ = ready_tx.send(Ok(rate));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            // Blocks until stop() sends or the handle is dropped.
            let _ = stop_rx.recv();
            drop(stream);
            tracing::info!(target: LOG_TARGET, "input stream stopped");
        });

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => return Err(CaptureError::ThreadExited),
        };

        Ok((
            Self {
                sample_rate,
                stop_tx: Some(stop_tx),
                thread: Some(thread),
            },
            block_rx,
        ))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!(target: LOG_TARGET, "capture thread panicked");
            }
        }
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn open_default_input(
    block_tx: mpsc::Sender<Vec<f32>>,
) -> Result<(cpal::Stream, u32), CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::NoInputDevice)?;
    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::Config(e.to_string()))?;

    let config: StreamConfig = supported.config();
    let rate = config.sample_rate.0;
    tracing::info!(
        target: LOG_TARGET,
        device = device.name().unwrap_or_else(|_| "unknown".to_owned()),
        sample_rate = rate,
        channels = config.channels,
        format = ?supported.sample_format(),
        "opening input device"
    );

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, block_tx)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, block_tx)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, block_tx)?,
        SampleFormat::I32 => build_stream::<i32>(&device, &config, block_tx)?,
        other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
    };
    stream
        .play()
        .map_err(|e| CaptureError::Play(e.to_string()))?;
    Ok((stream, rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    block_tx: mpsc::Sender<Vec<f32>>,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let channels = usize::from(config.channels.max(1));
    let err_fn = |err: cpal::StreamError| {
        tracing::error!(target: LOG_TARGET, error = %err, "input stream error");
    };

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let block = downmix(data, channels);
                match block_tx.try_send(block) {
                    Ok(()) | Err(mpsc::error::TrySendError::Closed(_)) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(target: LOG_TARGET, "analysis is behind, dropping block");
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| CaptureError::Build(e.to_string()))
}

/// Averages interleaved frames into one channel.
fn downmix<T>(data: &[T], channels: usize) -> Vec<f32>
where
    T: cpal::Sample,
    f32: cpal::FromSample<T>,
{
    data.chunks_exact(channels)
        .map(|frame| {
            let sum: f32 = frame
                .iter()
                .map(|&s| <f32 as cpal::Sample>::from_sample(s))
                .sum();
            sum / channels as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_stereo_frames() {
        let data = [0.5f32, -0.5, 1.0, 0.0];
        assert_eq!(downmix(&data, 2), vec![0.0, 0.5]);
    }

    #[test]
    fn downmix_converts_integer_samples() {
        let data = [0i16, i16::MIN];
        let out = downmix(&data, 1);
        assert_eq!(out[0], 0.0);
        assert!((out[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn downmix_drops_partial_frame() {
        let data = [0.25f32, 0.25, 0.75];
        assert_eq!(downmix(&data, 2), vec![0.25]);
    }
}
