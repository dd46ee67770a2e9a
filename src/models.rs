//! Core data models for storypoint
//!
//! These models are shared by the estimator, the record store and the CLI.
//! Field names of [`PredictionRecord`] and [`FeedbackRecord`] are the on-disk
//! schema of the history and feedback logs; renaming one breaks old logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point on the Agile estimation scale.
///
/// The scale is closed: every estimate produced by the crate is one of
/// these six values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum StoryPoints {
    One,
    Two,
    Three,
    Five,
    Eight,
    Thirteen,
}

impl StoryPoints {
    /// The scale in ascending order
    pub const SCALE: [StoryPoints; 6] = [
        StoryPoints::One,
        StoryPoints::Two,
        StoryPoints::Three,
        StoryPoints::Five,
        StoryPoints::Eight,
        StoryPoints::Thirteen,
    ];

    pub fn value(self) -> u32 {
        match self {
            StoryPoints::One => 1,
            StoryPoints::Two => 2,
            StoryPoints::Three => 3,
            StoryPoints::Five => 5,
            StoryPoints::Eight => 8,
            StoryPoints::Thirteen => 13,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.value())
    }
}

impl TryFrom<u32> for StoryPoints {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        StoryPoints::SCALE
            .into_iter()
            .find(|p| p.value() == value)
            .ok_or_else(|| format!("{value} is not on the story point scale (1, 2, 3, 5, 8, 13)"))
    }
}

impl From<StoryPoints> for u32 {
    fn from(points: StoryPoints) -> Self {
        points.value()
    }
}

impl std::fmt::Display for StoryPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// How close the raw model output landed to the chosen scale value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// Output of one pass through the estimation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    pub predicted_points: StoryPoints,
    /// Regressor output rounded to two decimal places
    pub raw_prediction: f64,
    pub model_used: String,
    pub confidence: Confidence,
}

/// One logged prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_story: String,
    pub predicted_points: StoryPoints,
    pub confidence: Confidence,
    pub model: String,
}

/// One logged human correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Not checked against the history log
    pub prediction_id: String,
    pub user_story: String,
    pub actual_points: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_is_ascending() {
        let values: Vec<u32> = StoryPoints::SCALE.iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![1, 2, 3, 5, 8, 13]);
        assert!(StoryPoints::SCALE.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_story_points_serialize_as_integer() {
        let json = serde_json::to_string(&StoryPoints::Eight).unwrap();
        assert_eq!(json, "8");

        let parsed: StoryPoints = serde_json::from_str("13").unwrap();
        assert_eq!(parsed, StoryPoints::Thirteen);

        assert!(serde_json::from_str::<StoryPoints>("4").is_err());
    }

    #[test]
    fn test_confidence_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Confidence::Medium).unwrap(), "\"medium\"");
        assert_eq!(Confidence::Low.to_string(), "low");
        assert!(Confidence::High < Confidence::Low);
    }

    #[test]
    fn test_try_from_rejects_off_scale() {
        assert_eq!(StoryPoints::try_from(5).unwrap(), StoryPoints::Five);
        let err = StoryPoints::try_from(7).unwrap_err();
        assert!(err.contains("not on the story point scale"));
    }
}
