//! storypoint - story point estimation with an auditable feedback log
//!
//! A regression model scores free-text user stories. The score is snapped to
//! the Agile scale (1, 2, 3, 5, 8, 13) with a confidence label, and every
//! prediction and human correction is appended to a local log for later
//! retraining.
//!
//! The model and the store are plain values. Build one of each at startup
//! and hand them to whatever serves requests:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use storypoint::{Estimator, ModelLoader, RecordStore};
//!
//! let loader = Arc::new(ModelLoader::new());
//! loader.load("ml_artifacts/vectorizer.json".as_ref(), "ml_artifacts/model.json".as_ref())?;
//! let store = RecordStore::open("data")?;
//!
//! let result = Estimator::new(loader).estimate("As a user, I want to reset my password")?;
//! let id = store.append_prediction(
//!     "As a user, I want to reset my password",
//!     result.predicted_points,
//!     result.confidence,
//!     &result.model_used,
//! )?;
//! ```

pub mod config;
pub mod estimator;
pub mod models;
pub mod store;

pub use estimator::{Estimator, EstimatorError, ModelLoader};
pub use models::{Confidence, EstimationResult, FeedbackRecord, PredictionRecord, StoryPoints};
pub use store::{RecordStore, StoreError};
