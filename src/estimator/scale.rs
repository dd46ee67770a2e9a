//! Mapping raw regressor output onto the story point scale
//!
//! The regressor is uncalibrated and unbounded. Its output is snapped to the
//! nearest scale value, and the residual distance becomes a confidence label.

use crate::models::{Confidence, StoryPoints};

/// Distances strictly below this are high confidence
pub const HIGH_CONFIDENCE_DISTANCE: f64 = 0.2;

/// Distances strictly below this (and not high) are medium confidence
pub const MEDIUM_CONFIDENCE_DISTANCE: f64 = 0.5;

/// Snap a raw score to the closest scale value.
///
/// Scores below the smallest value clamp to it. Large scores saturate at the
/// top of the scale through the distance rule itself. On a tie the smaller
/// value wins.
pub fn nearest_scale_value(raw: f64) -> StoryPoints {
    let lowest = StoryPoints::SCALE[0];
    if raw < lowest.as_f64() {
        return lowest;
    }

    let mut best = lowest;
    let mut best_distance = (raw - lowest.as_f64()).abs();
    for candidate in StoryPoints::SCALE.into_iter().skip(1) {
        let distance = (raw - candidate.as_f64()).abs();
        // Strict comparison keeps the earlier (smaller) value on ties
        if distance < best_distance {
            best = candidate;
            best_distance = distance;
        }
    }
    best
}

/// Confidence label for a raw score and the value it was mapped to
pub fn confidence_of(raw: f64, mapped: StoryPoints) -> Confidence {
    Confidence::from_distance((raw - mapped.as_f64()).abs())
}

impl Confidence {
    /// Threshold rule on the absolute residual. NaN is low.
    pub fn from_distance(distance: f64) -> Self {
        if distance < HIGH_CONFIDENCE_DISTANCE {
            Confidence::High
        } else if distance < MEDIUM_CONFIDENCE_DISTANCE {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}
