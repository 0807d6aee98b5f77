use crate::decode::AudioBuffer;
use serde::Serialize;

pub const MIN_SPEECH_SECS: f32 = 1.0;
pub const QUIET_PEAK: f32 = 0.01;
pub const LOW_SIGNAL_RMS: f32 = 0.001;

/// Why no recognizer produced text, judged from the signal alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDiagnosis {
    TooShort,
    TooQuiet,
    LowSignal,
    NotDetected,
}

impl SignalDiagnosis {
    /// Text that stands in for the transcript downstream.
    pub fn placeholder(&self) -> &'static str {
        match self {
            SignalDiagnosis::TooShort => "Audio too short for speech recognition",
            SignalDiagnosis::TooQuiet => "Audio too quiet to detect speech",
            SignalDiagnosis::LowSignal => "Low audio signal detected",
            SignalDiagnosis::NotDetected => "Speech not detected in audio",
        }
    }
}

pub fn diagnose(audio: &AudioBuffer) -> SignalDiagnosis {
    if audio.duration().as_secs_f32() < MIN_SPEECH_SECS {
        SignalDiagnosis::TooShort
    } else if audio.peak() < QUIET_PEAK {
        SignalDiagnosis::TooQuiet
    } else if audio.rms() < LOW_SIGNAL_RMS {
        SignalDiagnosis::LowSignal
    } else {
        SignalDiagnosis::NotDetected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::TARGET_SAMPLE_RATE;

    #[test]
    fn short_wins_over_quiet() {
        let audio = AudioBuffer::new(vec![0.0; 8_000], TARGET_SAMPLE_RATE).unwrap();
        assert_eq!(diagnose(&audio), SignalDiagnosis::TooShort);
    }

    #[test]
    fn single_spike_is_low_signal() {
        let mut samples = vec![0.0f32; 32_000];
        samples[100] = 0.05;
        let audio = AudioBuffer::new(samples, TARGET_SAMPLE_RATE).unwrap();
        // peak 0.05 passes the quiet check, rms is ~0.00028
        assert_eq!(diagnose(&audio), SignalDiagnosis::LowSignal);
    }

    #[test]
    fn exactly_one_second_is_not_short() {
        let audio = AudioBuffer::new(vec![0.0; 16_000], TARGET_SAMPLE_RATE).unwrap();
        assert_eq!(diagnose(&audio), SignalDiagnosis::TooQuiet);
    }
}
