use super::EmotionClassification;
use serde::{Deserialize, Serialize};

const RADAR_BPM_CEILING: f32 = 150.0;

/// Four-axis view of the fusion inputs, each axis in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionRadar {
    pub heart_rate: f32,
    pub volume: f32,
    pub repetition: f32,
    pub negativity: f32,
}

impl EmotionRadar {
    pub fn from_classification(c: &EmotionClassification) -> Self {
        let compound = c.inputs.sentiment_compound;
        Self {
            heart_rate: (c.inputs.max_bpm / RADAR_BPM_CEILING).clamp(0.0, 1.0),
            volume: c.inputs.mean_volume.clamp(0.0, 1.0),
            repetition: if c.factors.repetition_alert { 1.0 } else { 0.0 },
            negativity: if compound < 0.0 { compound.abs().min(1.0) } else { 0.0 },
        }
    }
}
