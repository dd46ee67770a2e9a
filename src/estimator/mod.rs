//! Story point estimation
//!
//! Pipeline: normalize text → TF-IDF features → regressor → scale mapping.
//!
//! The regressor output is continuous and uncalibrated. It is snapped to the
//! nearest value of the Agile scale (1, 2, 3, 5, 8, 13) and the distance to
//! that value becomes a high/medium/low confidence label.
//!
//! Nothing here writes to disk. Callers persist results through
//! [`crate::store::RecordStore`].

pub mod loader;
pub mod preprocess;
pub mod regressor;
pub mod scale;
pub mod train;
pub mod vectorizer;

pub use loader::{LoadedModel, ModelLoader, UNKNOWN_ALGORITHM};
pub use preprocess::normalize;
pub use regressor::{GbdtParams, Regressor, RegressorArtifact};
pub use scale::{confidence_of, nearest_scale_value};
pub use train::{train, Algorithm, TrainConfig, TrainError, TrainResult};
pub use vectorizer::TfidfVectorizer;

use crate::models::EstimationResult;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the inference adapter
#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("Model artifact not found or unreadable: {}", path.display())]
    ArtifactMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Model artifact is corrupt: {}: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("Model is not loaded. Load the artifacts first.")]
    ModelNotLoaded,
}

/// Round to two decimal places for display and logging
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// End-to-end estimation over a shared model
#[derive(Clone)]
pub struct Estimator {
    loader: Arc<ModelLoader>,
}

impl Estimator {
    pub fn new(loader: Arc<ModelLoader>) -> Self {
        Self { loader }
    }

    /// Estimate one story. Adapter errors pass through untouched.
    pub fn estimate(&self, story: &str) -> Result<EstimationResult, EstimatorError> {
        let cleaned = normalize(story);
        let raw = self.loader.predict(&cleaned)?;

        let predicted_points = nearest_scale_value(raw);
        let confidence = confidence_of(raw, predicted_points);

        Ok(EstimationResult {
            predicted_points,
            raw_prediction: round2(raw),
            model_used: self.loader.algorithm_identity().to_string(),
            confidence,
        })
    }

    /// Estimate several stories in parallel, keeping input order
    pub fn estimate_batch(&self, stories: &[String]) -> Vec<Result<EstimationResult, EstimatorError>> {
        stories.par_iter().map(|s| self.estimate(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, StoryPoints};

    /// Model whose output is `intercept + slope * tfidf("complex")`
    fn fixed_model(intercept: f64, slope: f64) -> Arc<ModelLoader> {
        let docs = vec!["simple change".to_string(), "complex migration".to_string()];
        let vectorizer = TfidfVectorizer::fit(&docs, 1000);
        let mut weights = vec![0.0; vectorizer.feature_count()];
        weights[vectorizer.vocabulary["complex"]] = slope;
        let artifact = RegressorArtifact::new(
            vectorizer.feature_count(),
            Regressor::LinearRegressor { weights, intercept },
        );
        let model = LoadedModel::new(vectorizer, artifact).unwrap();
        Arc::new(ModelLoader::with_model(model))
    }

    #[test]
    fn test_estimate_maps_and_rounds() {
        let estimator = Estimator::new(fixed_model(3.1234, 0.0));
        let result = estimator.estimate("As a user, I want a simple change").unwrap();

        assert_eq!(result.predicted_points, StoryPoints::Three);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.raw_prediction, 3.12);
        assert_eq!(result.model_used, "LinearRegressor");
    }

    #[test]
    fn test_estimate_tie_and_low_confidence() {
        let estimator = Estimator::new(fixed_model(4.0, 0.0));
        let result = estimator.estimate("anything at all").unwrap();
        assert_eq!(result.predicted_points, StoryPoints::Three);
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_estimate_clamps_negative_output() {
        let estimator = Estimator::new(fixed_model(-2.5, 0.0));
        let result = estimator.estimate("tiny").unwrap();
        assert_eq!(result.predicted_points, StoryPoints::One);
        assert_eq!(result.raw_prediction, -2.5);
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_estimate_uses_normalized_text() {
        let estimator = Estimator::new(fixed_model(1.0, 10.0));
        let plain = estimator.estimate("complex").unwrap();
        let noisy = estimator.estimate("  COMPLEX!!! 42 ").unwrap();
        assert_eq!(plain, noisy);
        assert_eq!(plain.predicted_points, StoryPoints::Thirteen);
    }

    #[test]
    fn test_estimate_without_model_propagates_error() {
        let estimator = Estimator::new(Arc::new(ModelLoader::new()));
        assert!(matches!(
            estimator.estimate("As a user, I want to log in"),
            Err(EstimatorError::ModelNotLoaded)
        ));
    }

    #[test]
    fn test_empty_story_is_estimated() {
        let estimator = Estimator::new(fixed_model(2.0, 5.0));
        let result = estimator.estimate("").unwrap();
        assert_eq!(result.predicted_points, StoryPoints::Two);
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn test_batch_preserves_order() {
        let estimator = Estimator::new(fixed_model(1.0, 10.0));
        let stories: Vec<String> = (0..32)
            .map(|i| if i % 2 == 0 { "complex".into() } else { "simple".into() })
            .collect();
        let results = estimator.estimate_batch(&stories);
        assert_eq!(results.len(), 32);
        for (i, result) in results.into_iter().enumerate() {
            let expected = if i % 2 == 0 { StoryPoints::Thirteen } else { StoryPoints::One };
            assert_eq!(result.unwrap().predicted_points, expected);
        }
    }
}
