//! Heart-rate and volume series supplied alongside a clip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const HIGH_BPM: f32 = 100.0;
const LOW_BPM: f32 = 60.0;
const VOLUME_SPIKE: f32 = 0.7;
const STABLE_STD: f32 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartRateStatus {
    High,
    Normal,
    Low,
}

impl HeartRateStatus {
    pub fn classify(bpm: f32) -> Self {
        if bpm > HIGH_BPM {
            HeartRateStatus::High
        } else if bpm < LOW_BPM {
            HeartRateStatus::Low
        } else {
            HeartRateStatus::Normal
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub timestamp: DateTime<Utc>,
    pub bpm: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeartRateSeries {
    samples: Vec<HeartRateSample>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HeartRateSummary {
    pub current: f32,
    pub average: f32,
    pub max: f32,
    pub min: f32,
    /// Latest reading minus the series mean.
    pub comparison_to_average: f32,
    pub status: Option<HeartRateStatus>,
}

impl HeartRateSeries {
    pub fn new(samples: Vec<HeartRateSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[HeartRateSample] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 0.0 for an empty series.
    pub fn max_bpm(&self) -> f32 {
        self.samples.iter().map(|s| s.bpm).reduce(f32::max).unwrap_or(0.0)
    }

    pub fn min_bpm(&self) -> f32 {
        self.samples.iter().map(|s| s.bpm).reduce(f32::min).unwrap_or(0.0)
    }

    pub fn mean_bpm(&self) -> f32 {
        mean(self.samples.iter().map(|s| s.bpm))
    }

    /// Most recent reading by timestamp.
    pub fn latest(&self) -> Option<&HeartRateSample> {
        self.samples.iter().max_by_key(|s| s.timestamp)
    }

    pub fn status(&self) -> Option<HeartRateStatus> {
        self.latest().map(|s| HeartRateStatus::classify(s.bpm))
    }

    pub fn summary(&self) -> HeartRateSummary {
        let current = self.latest().map_or(0.0, |s| s.bpm);
        let average = self.mean_bpm();
        HeartRateSummary {
            current,
            average,
            max: self.max_bpm(),
            min: self.min_bpm(),
            comparison_to_average: current - average,
            status: self.status(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumePattern {
    Stable,
    Variable,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeSample {
    #[serde(alias = "time_step")]
    pub index: usize,
    pub volume: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeSeries {
    samples: Vec<VolumeSample>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VolumeSummary {
    pub average: f32,
    pub max: f32,
    pub std_dev: f32,
    pub spikes: usize,
    pub pattern: VolumePattern,
}

impl VolumeSeries {
    pub fn new(samples: Vec<VolumeSample>) -> Self {
        Self { samples }
    }

    pub fn from_levels(levels: &[f32]) -> Self {
        Self::new(
            levels
                .iter()
                .enumerate()
                .map(|(index, &volume)| VolumeSample { index, volume })
                .collect(),
        )
    }

    pub fn samples(&self) -> &[VolumeSample] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn mean(&self) -> f32 {
        mean(self.samples.iter().map(|s| s.volume))
    }

    pub fn max(&self) -> f32 {
        self.samples.iter().map(|s| s.volume).reduce(f32::max).unwrap_or(0.0)
    }

    /// Sample standard deviation (n - 1); 0.0 with fewer than two samples.
    pub fn std_dev(&self) -> f32 {
        let n = self.samples.len();
        if n < 2 {
            return 0.0;
        }
        let m = self.mean();
        let var = self
            .samples
            .iter()
            .map(|s| (s.volume - m).powi(2))
            .sum::<f32>()
            / (n - 1) as f32;
        var.sqrt()
    }

    pub fn spikes(&self) -> usize {
        self.samples.iter().filter(|s| s.volume > VOLUME_SPIKE).count()
    }

    pub fn pattern(&self) -> VolumePattern {
        if self.std_dev() < STABLE_STD {
            VolumePattern::Stable
        } else {
            VolumePattern::Variable
        }
    }

    pub fn summary(&self) -> VolumeSummary {
        VolumeSummary {
            average: self.mean(),
            max: self.max(),
            std_dev: self.std_dev(),
            spikes: self.spikes(),
            pattern: self.pattern(),
        }
    }
}

/// Physiological and loudness context for one analysis.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    #[serde(default)]
    pub heart_rate: HeartRateSeries,
    #[serde(default)]
    pub volume: VolumeSeries,
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, n) = values.fold((0.0f32, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hr(secs: i64, bpm: f32) -> HeartRateSample {
        HeartRateSample {
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            bpm,
        }
    }

    #[test]
    fn heart_rate_stats() {
        let series = HeartRateSeries::new(vec![hr(2, 95.0), hr(0, 70.0), hr(1, 105.0)]);
        assert_eq!(series.max_bpm(), 105.0);
        assert_eq!(series.min_bpm(), 70.0);
        assert!((series.mean_bpm() - 90.0).abs() < 1e-4);
        assert_eq!(series.latest().map(|s| s.bpm), Some(95.0));
        assert_eq!(series.status(), Some(HeartRateStatus::Normal));

        let summary = series.summary();
        assert_eq!(summary.current, 95.0);
        assert!((summary.comparison_to_average - 5.0).abs() < 1e-4);
    }

    #[test]
    fn empty_heart_rate_is_zero_and_not_high() {
        let series = HeartRateSeries::default();
        assert_eq!(series.max_bpm(), 0.0);
        assert_eq!(series.summary().status, None);
        assert_eq!(series.summary().comparison_to_average, 0.0);
    }

    #[test]
    fn heart_rate_status_boundaries() {
        assert_eq!(HeartRateStatus::classify(100.0), HeartRateStatus::Normal);
        assert_eq!(HeartRateStatus::classify(100.5), HeartRateStatus::High);
        assert_eq!(HeartRateStatus::classify(60.0), HeartRateStatus::Normal);
        assert_eq!(HeartRateStatus::classify(59.0), HeartRateStatus::Low);
    }

    #[test]
    fn volume_stats() {
        let series = VolumeSeries::from_levels(&[0.2, 0.4, 0.9, 0.5]);
        assert!((series.mean() - 0.5).abs() < 1e-5);
        assert_eq!(series.max(), 0.9);
        assert_eq!(series.spikes(), 1);
        // deviations -0.3, -0.1, 0.4, 0.0 -> var 0.26 / 3
        assert!((series.std_dev() - (0.26f32 / 3.0).sqrt()).abs() < 1e-4);
        assert_eq!(series.pattern(), VolumePattern::Variable);
    }

    #[test]
    fn flat_volume_is_stable() {
        let series = VolumeSeries::from_levels(&[0.5, 0.52, 0.48]);
        assert_eq!(series.pattern(), VolumePattern::Stable);
        assert_eq!(VolumeSeries::from_levels(&[0.9]).std_dev(), 0.0);
    }

    #[test]
    fn vitals_parse_from_json() {
        let vitals: Vitals = serde_json::from_str(
            r#"{
                "heart_rate": [{"timestamp": "2024-05-01T10:00:00Z", "bpm": 104}],
                "volume": [{"time_step": 0, "volume": 0.6}, {"index": 1, "volume": 0.7}]
            }"#,
        )
        .unwrap();
        assert_eq!(vitals.heart_rate.max_bpm(), 104.0);
        assert_eq!(vitals.volume.samples()[1].index, 1);
        assert!((vitals.volume.mean() - 0.65).abs() < 1e-5);

        let empty: Vitals = serde_json::from_str("{}").unwrap();
        assert!(empty.heart_rate.is_empty());
    }
}
