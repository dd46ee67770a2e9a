//! Offline training
//!
//! Fits a vectorizer and a regressor on the built-in seed stories plus any
//! human corrections from the feedback log, then writes both artifacts.
//! Run explicitly through `storypoint train`; nothing retrains on its own.

use super::preprocess::normalize;
use super::regressor::{GbdtParams, Regressor, RegressorArtifact};
use super::vectorizer::TfidfVectorizer;
use crate::models::FeedbackRecord;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Labelled stories every model is trained on
pub const SEED_STORIES: &[(&str, u32)] = &[
    ("As a user, I want to log in so that I can access my account", 2),
    ("As a user, I want to reset my password via email", 3),
    ("As an admin, I want to view a dashboard of all users", 5),
    ("As a user, I want to upload a profile picture", 3),
    ("As a user, I want to integrate with a third-party API for payments", 8),
    ("As an admin, I want to generate a downloadable PDF report of monthly sales", 8),
    ("As a user, I want to have a persistent shopping cart", 5),
    ("As a user, I want to change the color theme of the app", 2),
    ("As a user, I want multi-factor authentication", 5),
    ("As a developer, I want to migrate the database to a new schema without downtime", 13),
    ("As a user, I want to search for items by keyword", 3),
    ("As a user, I want to filter search results by price range", 3),
    ("As a user, I want to see a history of my orders", 5),
    ("As a user, I want to get push notifications for new messages", 5),
    ("As a user, I want to delete my account permanently", 3),
];

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("Training stories produced an empty vocabulary")]
    EmptyVocabulary,

    #[error("Model fitting failed: {0}")]
    Solver(String),

    #[error("Failed to write artifact {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode artifact: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Which regressor to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    GradientBoosting,
    Ridge,
}

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub vectorizer_path: PathBuf,
    pub model_path: PathBuf,
    /// Vocabulary cap
    pub max_features: usize,
    pub algorithm: Algorithm,
    pub gbdt: GbdtParams,
    /// Ridge penalty
    pub alpha: f64,
    pub include_feedback: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            vectorizer_path: PathBuf::from("ml_artifacts/vectorizer.json"),
            model_path: PathBuf::from("ml_artifacts/model.json"),
            max_features: 1000,
            algorithm: Algorithm::GradientBoosting,
            gbdt: GbdtParams::default(),
            alpha: 1.0,
            include_feedback: true,
        }
    }
}

/// Training result
#[derive(Debug, Serialize)]
pub struct TrainResult {
    pub samples: usize,
    pub feedback_samples: usize,
    pub vocabulary_size: usize,
    pub algorithm: &'static str,
    /// Root mean squared error on the training set
    pub training_rmse: f64,
    pub vectorizer_path: PathBuf,
    pub model_path: PathBuf,
}

/// Fit and save a new vectorizer + regressor pair
pub fn train(config: &TrainConfig, feedback: &[FeedbackRecord]) -> Result<TrainResult, TrainError> {
    let mut stories: Vec<String> = SEED_STORIES.iter().map(|(s, _)| normalize(s)).collect();
    let mut targets: Vec<f64> = SEED_STORIES.iter().map(|(_, p)| f64::from(*p)).collect();

    let feedback_samples = if config.include_feedback {
        for record in feedback {
            stories.push(normalize(&record.user_story));
            targets.push(f64::from(record.actual_points));
        }
        feedback.len()
    } else {
        0
    };

    info!(
        "Training on {} stories ({} from feedback)",
        stories.len(),
        feedback_samples
    );

    let vectorizer = TfidfVectorizer::fit(&stories, config.max_features);
    let width = vectorizer.feature_count();
    if width == 0 {
        return Err(TrainError::EmptyVocabulary);
    }
    let rows: Vec<Vec<f64>> = stories.iter().map(|s| vectorizer.transform(s)).collect();

    let model = match config.algorithm {
        Algorithm::GradientBoosting => {
            Regressor::fit_gradient_boosting(&rows, &targets, width, &config.gbdt)
        }
        Algorithm::Ridge => Regressor::fit_ridge(&rows, &targets, width, config.alpha),
    }
    .map_err(TrainError::Solver)?;

    let squared_error: f64 = rows
        .iter()
        .zip(&targets)
        .map(|(row, y)| (model.predict(row) - y).powi(2))
        .sum();
    let training_rmse = (squared_error / rows.len() as f64).sqrt();
    let algorithm = model.algorithm_name();
    info!(
        "Fitted {} over {} features, training RMSE {:.3}",
        algorithm, width, training_rmse
    );

    let artifact = RegressorArtifact::new(width, model);
    write_json(&config.vectorizer_path, &vectorizer)?;
    write_json(&config.model_path, &artifact)?;

    Ok(TrainResult {
        samples: stories.len(),
        feedback_samples,
        vocabulary_size: width,
        algorithm,
        training_rmse,
        vectorizer_path: config.vectorizer_path.clone(),
        model_path: config.model_path.clone(),
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), TrainError> {
    let artifact_err = |source| TrainError::Artifact {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(artifact_err)?;
    }
    let content = serde_json::to_string(value)?;
    std::fs::write(path, content).map_err(artifact_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{Estimator, ModelLoader};
    use crate::models::StoryPoints;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, algorithm: Algorithm) -> TrainConfig {
        TrainConfig {
            vectorizer_path: dir.path().join("artifacts/vectorizer.json"),
            model_path: dir.path().join("artifacts/model.json"),
            algorithm,
            gbdt: GbdtParams {
                trees: 20,
                max_depth: 3,
                learning_rate: 0.3,
            },
            ..Default::default()
        }
    }

    fn feedback(story: &str, points: u32) -> FeedbackRecord {
        FeedbackRecord {
            id: "fb".into(),
            timestamp: chrono::Utc::now(),
            prediction_id: "unknown".into(),
            user_story: story.into(),
            actual_points: points,
        }
    }

    #[test]
    fn test_train_writes_loadable_artifacts() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir, Algorithm::GradientBoosting);

        let result = train(&config, &[]).expect("training should succeed");
        assert_eq!(result.samples, SEED_STORIES.len());
        assert_eq!(result.feedback_samples, 0);
        assert_eq!(result.algorithm, "GradientBoostingRegressor");
        assert!(result.vocabulary_size > 0);
        assert!(result.training_rmse.is_finite());

        let loader = Arc::new(ModelLoader::new());
        loader.load(&result.vectorizer_path, &result.model_path).unwrap();
        let estimate = Estimator::new(loader)
            .estimate("As a user, I want to reset my password via email")
            .unwrap();
        assert!(StoryPoints::SCALE.contains(&estimate.predicted_points));
        assert_eq!(estimate.model_used, "GradientBoostingRegressor");
    }

    #[test]
    fn test_ridge_fits_seed_stories_closely() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir, Algorithm::Ridge);
        config.alpha = 1e-3;

        let result = train(&config, &[]).unwrap();
        assert_eq!(result.algorithm, "LinearRegressor");
        assert!(result.training_rmse < 1.0, "rmse {}", result.training_rmse);
    }

    #[test]
    fn test_feedback_extends_training_set() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir, Algorithm::Ridge);
        let corrections = vec![
            feedback("As an auditor, I want immutable ledgers", 13),
            feedback("As a user, I want dark mode", 2),
        ];

        let result = train(&config, &corrections).unwrap();
        assert_eq!(result.samples, SEED_STORIES.len() + 2);
        assert_eq!(result.feedback_samples, 2);

        let without = TrainConfig {
            include_feedback: false,
            ..config
        };
        let result = train(&without, &corrections).unwrap();
        assert_eq!(result.samples, SEED_STORIES.len());
        assert_eq!(result.feedback_samples, 0);
    }

    #[test]
    fn test_unwritable_artifact_path() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let config = TrainConfig {
            vectorizer_path: blocker.join("vectorizer.json"),
            model_path: blocker.join("model.json"),
            algorithm: Algorithm::Ridge,
            ..Default::default()
        };
        assert!(matches!(
            train(&config, &[]),
            Err(TrainError::Artifact { .. })
        ));
    }
}
