mod overview;
mod radar;
mod vitals;

use serde::{Deserialize, Serialize};

pub use overview::{Alert, HeartRateInsights, Severity, VitalsOverview};
pub use radar::EmotionRadar;
pub use vitals::{
    HeartRateSample, HeartRateSeries, HeartRateStatus, HeartRateSummary, VolumePattern,
    VolumeSample, VolumeSeries, VolumeSummary, Vitals,
};

pub const HIGH_BPM: f32 = 100.0;
pub const HIGH_VOLUME: f32 = 0.5;
pub const REPETITION_ALERT: usize = 2;
pub const NEGATIVE_COMPOUND: f32 = -0.3;
pub const POSITIVE_COMPOUND: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmotionLabel {
    Anxious,
    Sad,
    Happy,
    Neutral,
}

impl EmotionLabel {
    pub fn emoji(&self) -> &'static str {
        match self {
            EmotionLabel::Anxious => "😰",
            EmotionLabel::Sad => "😢",
            EmotionLabel::Happy => "😊",
            EmotionLabel::Neutral => "😐",
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            EmotionLabel::Anxious => 0.9,
            EmotionLabel::Sad => 0.7,
            EmotionLabel::Happy => 0.8,
            EmotionLabel::Neutral => 0.6,
        }
    }
}

/// Raw numbers the decision tree looks at.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FusionInputs {
    pub max_bpm: f32,
    pub mean_volume: f32,
    pub repetition_count: usize,
    pub sentiment_compound: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionFactors {
    pub high_bpm: bool,
    pub high_volume: bool,
    pub repetition_alert: bool,
    pub negative_sentiment: bool,
}

impl EmotionFactors {
    pub fn evaluate(inputs: &FusionInputs) -> Self {
        Self {
            high_bpm: inputs.max_bpm > HIGH_BPM,
            high_volume: inputs.mean_volume > HIGH_VOLUME,
            repetition_alert: inputs.repetition_count >= REPETITION_ALERT,
            negative_sentiment: inputs.sentiment_compound < NEGATIVE_COMPOUND,
        }
    }

    pub fn all(&self) -> bool {
        self.high_bpm && self.high_volume && self.repetition_alert && self.negative_sentiment
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmotionClassification {
    pub label: EmotionLabel,
    pub emoji: &'static str,
    pub confidence: f32,
    pub factors: EmotionFactors,
    pub inputs: FusionInputs,
}

/// First matching branch wins: all four factors, then negative sentiment, then clearly
/// positive sentiment, then neutral.
pub fn classify(inputs: FusionInputs) -> EmotionClassification {
    let factors = EmotionFactors::evaluate(&inputs);
    let label = if factors.all() {
        EmotionLabel::Anxious
    } else if factors.negative_sentiment {
        EmotionLabel::Sad
    } else if inputs.sentiment_compound > POSITIVE_COMPOUND {
        EmotionLabel::Happy
    } else {
        EmotionLabel::Neutral
    };

    EmotionClassification {
        label,
        emoji: label.emoji(),
        confidence: label.confidence(),
        factors,
        inputs,
    }
}

/// Flat record handed to transports and the journal.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmotionReport {
    pub emotion: EmotionLabel,
    pub emoji: &'static str,
    pub confidence: f32,
    pub high_bpm: bool,
    pub high_volume: bool,
    pub repetition_alert: bool,
    pub negative_sentiment: bool,
    pub sentiment_compound: f32,
    pub repetition_count: usize,
    pub max_bpm: f32,
    pub average_volume: f32,
    pub breathing_recommended: bool,
    pub radar: EmotionRadar,
}

impl From<EmotionClassification> for EmotionReport {
    fn from(c: EmotionClassification) -> Self {
        let radar = EmotionRadar::from_classification(&c);
        Self {
            emotion: c.label,
            emoji: c.emoji,
            confidence: c.confidence,
            high_bpm: c.factors.high_bpm,
            high_volume: c.factors.high_volume,
            repetition_alert: c.factors.repetition_alert,
            negative_sentiment: c.factors.negative_sentiment,
            sentiment_compound: c.inputs.sentiment_compound,
            repetition_count: c.inputs.repetition_count,
            max_bpm: c.inputs.max_bpm,
            average_volume: c.inputs.mean_volume,
            breathing_recommended: c.factors.high_bpm || c.label == EmotionLabel::Anxious,
            radar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(max_bpm: f32, mean_volume: f32, repetition_count: usize, compound: f32) -> FusionInputs {
        FusionInputs {
            max_bpm,
            mean_volume,
            repetition_count,
            sentiment_compound: compound,
        }
    }

    #[test]
    fn all_factors_is_anxious() {
        let c = classify(inputs(105.0, 0.6, 2, -0.71));
        assert_eq!(c.label, EmotionLabel::Anxious);
        assert_eq!(c.confidence, 0.9);
        assert_eq!(c.emoji, "😰");
        assert!(c.factors.all());
    }

    #[test]
    fn negative_without_arousal_is_sad() {
        let c = classify(inputs(72.0, 0.2, 0, -0.5));
        assert_eq!(c.label, EmotionLabel::Sad);
        assert_eq!(c.confidence, 0.7);
        assert!(!c.factors.high_bpm);
    }

    #[test]
    fn three_factors_still_sad() {
        let c = classify(inputs(120.0, 0.9, 1, -0.8));
        assert_eq!(c.label, EmotionLabel::Sad);
    }

    #[test]
    fn positive_is_happy() {
        let c = classify(inputs(120.0, 0.9, 5, 0.31));
        assert_eq!(c.label, EmotionLabel::Happy);
        assert_eq!(c.confidence, 0.8);
    }

    #[test]
    fn thresholds_are_strict() {
        let c = classify(inputs(100.0, 0.5, 1, -0.3));
        assert_eq!(c.factors, EmotionFactors {
            high_bpm: false,
            high_volume: false,
            repetition_alert: false,
            negative_sentiment: false,
        });
        assert_eq!(c.label, EmotionLabel::Neutral);

        assert_eq!(classify(inputs(0.0, 0.0, 0, 0.3)).label, EmotionLabel::Neutral);
        assert_eq!(classify(inputs(0.0, 0.0, 0, 0.3)).confidence, 0.6);
    }

    #[test]
    fn classification_is_deterministic() {
        let i = inputs(101.0, 0.51, 2, -0.31);
        assert_eq!(classify(i), classify(i));
    }

    #[test]
    fn report_recommends_breathing_on_high_bpm() {
        let report = EmotionReport::from(classify(inputs(110.0, 0.1, 0, 0.5)));
        assert_eq!(report.emotion, EmotionLabel::Happy);
        assert!(report.breathing_recommended);

        let calm = EmotionReport::from(classify(inputs(70.0, 0.1, 0, 0.0)));
        assert!(!calm.breathing_recommended);
    }

    #[test]
    fn report_serializes_flat() {
        let report = EmotionReport::from(classify(inputs(105.0, 0.6, 2, -0.71)));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["emotion"], "Anxious");
        assert_eq!(json["high_bpm"], true);
        assert_eq!(json["repetition_count"], 2);
        assert_eq!(json["breathing_recommended"], true);
    }
}
