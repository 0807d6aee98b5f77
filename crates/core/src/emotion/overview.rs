//! Status-keyed guidance built from the heart-rate summary and the fused emotion.

use super::{EmotionLabel, EmotionReport, HeartRateStatus, HeartRateSummary};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
    Success,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeartRateInsights {
    pub severity: Severity,
    pub insights: &'static [&'static str],
    pub recommendations: &'static [&'static str],
}

impl HeartRateInsights {
    pub fn for_status(status: HeartRateStatus) -> Self {
        match status {
            HeartRateStatus::High => Self {
                severity: Severity::Warning,
                insights: &[
                    "Elevated heart rate detected",
                    "Your heart rate is above the normal resting range",
                    "This could indicate stress, anxiety or physical activity",
                ],
                recommendations: &[
                    "Try deep breathing exercises",
                    "Sit or lie down in a comfortable position",
                    "Drink cool water",
                    "Get fresh air if possible",
                ],
            },
            HeartRateStatus::Low => Self {
                severity: Severity::Info,
                insights: &[
                    "Low heart rate detected",
                    "Your heart rate is below the typical resting range",
                    "This could be normal for athletes or indicate relaxation",
                ],
                recommendations: &[
                    "Consider a warm drink",
                    "Try gentle movement or stretching",
                    "Get some natural light",
                ],
            },
            HeartRateStatus::Normal => Self {
                severity: Severity::Success,
                insights: &[
                    "Normal heart rate range",
                    "Your heart rate is in a healthy resting range (60-100 BPM)",
                    "This suggests good cardiovascular health",
                ],
                recommendations: &[
                    "Continue current activities",
                    "Good time for regular exercise",
                    "Practice mindfulness",
                ],
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub message: &'static str,
}

pub const ELEVATED_HEART_RATE: &str = "Elevated heart rate detected";
pub const BREATHING_SUGGESTED: &str = "Consider breathing exercise";
pub const ALL_NORMAL: &str = "All vitals normal";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VitalsOverview {
    /// Absent when no heart-rate readings were supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<HeartRateInsights>,
    pub alerts: Vec<Alert>,
}

impl VitalsOverview {
    pub fn build(heart_rate: &HeartRateSummary, emotion: &EmotionReport) -> Self {
        let elevated = heart_rate.status == Some(HeartRateStatus::High);
        let anxious = emotion.emotion == EmotionLabel::Anxious;

        let mut alerts = Vec::new();
        if elevated {
            alerts.push(Alert {
                severity: Severity::Warning,
                message: ELEVATED_HEART_RATE,
            });
        }
        if anxious {
            alerts.push(Alert {
                severity: Severity::Info,
                message: BREATHING_SUGGESTED,
            });
        }
        if !elevated && !anxious {
            alerts.push(Alert {
                severity: Severity::Success,
                message: ALL_NORMAL,
            });
        }

        Self {
            heart_rate: heart_rate.status.map(HeartRateInsights::for_status),
            alerts,
        }
    }
}
