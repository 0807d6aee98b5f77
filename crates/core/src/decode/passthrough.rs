use super::{
    downmix_into, AudioBuffer, DecodeSource, NormalizeStrategy, Result, TARGET_SAMPLE_RATE,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use hound::{SampleFormat, WavReader};
use std::io::{Cursor, Read};

/// Reads the bytes as WAV assumed to already be at the target rate.
///
/// A strict read of the first second must succeed; the full read then stops at the
/// first unreadable sample, which tolerates truncated data chunks.
#[derive(Clone, Debug)]
pub struct PassThrough {
    target_rate: u32,
}

impl Default for PassThrough {
    fn default() -> Self {
        Self {
            target_rate: TARGET_SAMPLE_RATE,
        }
    }
}

impl PassThrough {
    pub fn read(&self, source: &DecodeSource) -> Result<AudioBuffer> {
        let probe = WavReader::new(Cursor::new(source.bytes().clone()))?;
        let channels = usize::from(probe.spec().channels.max(1));
        let probe_len = self.target_rate as usize * channels;
        read_interleaved(probe, Some(probe_len), true)?;

        let reader = WavReader::new(Cursor::new(source.bytes().clone()))?;
        let interleaved = read_interleaved(reader, None, false)?;
        let mut mono = Vec::with_capacity(interleaved.len() / channels);
        downmix_into(&mut mono, &interleaved, channels);
        AudioBuffer::new(mono, self.target_rate)
    }
}

impl NormalizeStrategy for PassThrough {
    fn name(&self) -> &'static str {
        "pass-through"
    }

    fn normalize<'a>(&'a self, source: &'a DecodeSource) -> BoxFuture<'a, Result<AudioBuffer>> {
        async move { self.read(source) }.boxed()
    }
}

fn read_interleaved<R: Read>(
    reader: WavReader<R>,
    limit: Option<usize>,
    strict: bool,
) -> Result<Vec<f32>> {
    let spec = reader.spec();
    let limit = limit.unwrap_or(usize::MAX);
    match spec.sample_format {
        SampleFormat::Float => collect(reader.into_samples::<f32>().take(limit), strict),
        SampleFormat::Int => {
            let full_scale = (1i64 << spec.bits_per_sample.saturating_sub(1)) as f32;
            let samples = reader
                .into_samples::<i32>()
                .take(limit)
                .map(move |s| s.map(|v| v as f32 / full_scale));
            collect(samples, strict)
        }
    }
}

fn collect<I>(samples: I, strict: bool) -> Result<Vec<f32>>
where
    I: Iterator<Item = hound::Result<f32>>,
{
    if strict {
        Ok(samples.collect::<hound::Result<Vec<f32>>>()?)
    } else {
        Ok(samples.map_while(|s| s.ok()).collect())
    }
}
