use super::{
    downmix_into, resample, AudioBuffer, DecodeError, DecodeSource, NormalizeStrategy, Result,
    TARGET_SAMPLE_RATE,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::io::{Cursor, ErrorKind};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

const LOG_TARGET: &str = "decode::container";

/// Decodes a known container at its native rate, then down-mixes and resamples.
#[derive(Clone, Debug)]
pub struct ContainerDecode {
    target_rate: u32,
}

impl Default for ContainerDecode {
    fn default() -> Self {
        Self {
            target_rate: TARGET_SAMPLE_RATE,
        }
    }
}

impl ContainerDecode {
    pub fn decode(&self, source: &DecodeSource) -> Result<AudioBuffer> {
        let media: Box<dyn MediaSource> = match source.reopen() {
            Some(Ok(file)) => Box::new(file),
            Some(Err(e)) => {
                tracing::debug!(target: LOG_TARGET, error = %e, "spool unreadable, using in-memory bytes");
                Box::new(Cursor::new(source.bytes().clone()))
            }
            None => Box::new(Cursor::new(source.bytes().clone())),
        };

        let (mono, native_rate) = decode_mono(media, source.hint())?;
        if mono.is_empty() {
            return Err(DecodeError::Empty);
        }
        tracing::debug!(
            target: LOG_TARGET,
            native_rate,
            frames = mono.len(),
            "container decoded"
        );

        let samples = resample(&mono, native_rate, self.target_rate)?;
        AudioBuffer::new(samples, self.target_rate)
    }
}

impl NormalizeStrategy for ContainerDecode {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn normalize<'a>(&'a self, source: &'a DecodeSource) -> BoxFuture<'a, Result<AudioBuffer>> {
        async move { self.decode(source) }.boxed()
    }
}

fn decode_mono(media: Box<dyn MediaSource>, ext: Option<&str>) -> Result<(Vec<f32>, u32)> {
    let mss = MediaSourceStream::new(media, Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = ext {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs().make(&params, &DecoderOptions::default())?;
    let mut mono = Vec::new();
    let mut rate = params.sample_rate;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                if rate.is_none() {
                    rate = Some(spec.rate);
                }
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                downmix_into(&mut mono, buf.samples(), spec.channels.count());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(target: LOG_TARGET, error = e, "skipping undecodable packet");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let rate = rate.ok_or_else(|| DecodeError::InvalidPcm("unknown sample rate".to_owned()))?;
    Ok((mono, rate))
}
