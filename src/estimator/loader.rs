//! Model inference adapter
//!
//! Holds one vectorizer + regressor pair behind a one-shot gate. Loading is
//! serialized by a mutex around check-then-load; once the pair is set it is
//! never mutated, so predictions read it without locking.

use super::regressor::RegressorArtifact;
use super::vectorizer::TfidfVectorizer;
use super::EstimatorError;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::{debug, info};

/// Reported when no model is loaded
pub const UNKNOWN_ALGORITHM: &str = "Unknown";

/// A consistent vectorizer + regressor pair
pub struct LoadedModel {
    vectorizer: TfidfVectorizer,
    regressor: RegressorArtifact,
}

impl LoadedModel {
    /// Pair a vectorizer with a regressor fitted on its output
    pub fn new(vectorizer: TfidfVectorizer, regressor: RegressorArtifact) -> Result<Self, String> {
        vectorizer.validate()?;
        regressor.validate()?;
        if regressor.feature_count != vectorizer.feature_count() {
            return Err(format!(
                "regressor expects {} features but the vectorizer produces {}",
                regressor.feature_count,
                vectorizer.feature_count()
            ));
        }
        Ok(Self {
            vectorizer,
            regressor,
        })
    }

    /// Read and parse both artifacts.
    ///
    /// Both paths are read before either is parsed, so a missing file is
    /// always reported as missing rather than as a parse failure.
    pub fn from_artifacts(vectorizer_path: &Path, model_path: &Path) -> Result<Self, EstimatorError> {
        let vectorizer_bytes = read_artifact(vectorizer_path)?;
        let model_bytes = read_artifact(model_path)?;

        let vectorizer: TfidfVectorizer = parse_artifact(vectorizer_path, &vectorizer_bytes)?;
        let regressor: RegressorArtifact = parse_artifact(model_path, &model_bytes)?;

        Self::new(vectorizer, regressor).map_err(|reason| EstimatorError::ArtifactCorrupt {
            path: model_path.to_path_buf(),
            reason,
        })
    }

    /// Raw regressor output for one normalized story
    pub fn predict(&self, normalized: &str) -> f64 {
        let features = self.vectorizer.transform(normalized);
        self.regressor.model.predict(&features)
    }

    pub fn algorithm_name(&self) -> &'static str {
        self.regressor.model.algorithm_name()
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, EstimatorError> {
    std::fs::read(path).map_err(|source| EstimatorError::ArtifactMissing {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_artifact<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, EstimatorError> {
    serde_json::from_slice(bytes).map_err(|e| EstimatorError::ArtifactCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Process-wide model holder, shared by reference or `Arc`
pub struct ModelLoader {
    model: OnceLock<LoadedModel>,
    load_lock: Mutex<()>,
}

impl ModelLoader {
    /// Create an unloaded adapter
    pub fn new() -> Self {
        Self {
            model: OnceLock::new(),
            load_lock: Mutex::new(()),
        }
    }

    /// Create an adapter that is already loaded
    pub fn with_model(model: LoadedModel) -> Self {
        let loader = Self::new();
        let _ = loader.model.set(model);
        loader
    }

    /// Load both artifacts once.
    ///
    /// Later calls after a successful load do nothing. A failed load leaves
    /// the adapter unloaded, so it can be retried.
    pub fn load(&self, vectorizer_path: &Path, model_path: &Path) -> Result<(), EstimatorError> {
        if self.model.get().is_some() {
            info!("Model already loaded.");
            return Ok(());
        }

        let _guard = self
            .load_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Another caller may have finished loading while we waited
        if self.model.get().is_some() {
            info!("Model already loaded.");
            return Ok(());
        }

        info!(
            "Loading model from {} and vectorizer from {}...",
            model_path.display(),
            vectorizer_path.display()
        );
        let loaded = LoadedModel::from_artifacts(vectorizer_path, model_path)?;
        debug!(
            "Vocabulary size {}, algorithm {}",
            loaded.vectorizer.feature_count(),
            loaded.algorithm_name()
        );

        let _ = self.model.set(loaded);
        info!("Model and vectorizer loaded successfully.");
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// Raw prediction for an already-normalized story
    pub fn predict(&self, normalized: &str) -> Result<f64, EstimatorError> {
        let model = self.model.get().ok_or(EstimatorError::ModelNotLoaded)?;
        Ok(model.predict(normalized))
    }

    /// Algorithm class of the loaded regressor, or "Unknown"
    pub fn algorithm_identity(&self) -> &str {
        self.model
            .get()
            .map(LoadedModel::algorithm_name)
            .unwrap_or(UNKNOWN_ALGORITHM)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
