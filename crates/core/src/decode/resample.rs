use super::{DecodeError, Result};
use rubato::{FftFixedIn, Resampler};

const CHUNK_FRAMES: usize = 1024;

/// Resamples mono audio, compensating for the resampler's output delay.
pub fn resample(samples: &[f32], from_hz: u32, to_hz: u32) -> Result<Vec<f32>> {
    if from_hz == 0 || to_hz == 0 {
        return Err(DecodeError::Resample(format!(
            "invalid rates {from_hz} -> {to_hz}"
        )));
    }
    if from_hz == to_hz || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedIn::<f32>::new(from_hz as usize, to_hz as usize, CHUNK_FRAMES, 2, 1)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;

    let expected = ((samples.len() as u64 * u64::from(to_hz)) / u64::from(from_hz)) as usize;
    let delay = resampler.output_delay();
    let mut out = Vec::with_capacity(expected + delay);
    let mut pos = 0;

    while samples.len() - pos >= resampler.input_frames_next() {
        let n = resampler.input_frames_next();
        let chunk: [&[f32]; 1] = [&samples[pos..pos + n]];
        let frames = resampler
            .process(&chunk[..], None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        out.extend_from_slice(&frames[0]);
        pos += n;
    }

    if pos < samples.len() {
        let tail: [&[f32]; 1] = [&samples[pos..]];
        let frames = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        out.extend_from_slice(&frames[0]);
    }

    while out.len() < expected + delay {
        let frames = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| DecodeError::Resample(e.to_string()))?;
        if frames[0].is_empty() {
            break;
        }
        out.extend_from_slice(&frames[0]);
    }

    Ok(out.into_iter().skip(delay).take(expected).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_identity() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&input, 16_000, 16_000).unwrap(), input);
    }

    #[test]
    fn downsample_length_matches_ratio() {
        let input = vec![0.25f32; 48_000];
        let out = resample(&input, 48_000, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);
        // steady-state region should preserve the DC level
        let mid = out[8_000];
        assert!((mid - 0.25).abs() < 0.02, "mid sample {mid}");
    }

    #[test]
    fn zero_rate_rejected() {
        assert!(matches!(
            resample(&[0.0], 0, 16_000),
            Err(DecodeError::Resample(_))
        ));
    }
}
