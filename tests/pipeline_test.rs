//! Library-level tests: train, load, estimate and log from many threads

use std::sync::Arc;
use std::thread;
use storypoint::estimator::{train, Algorithm, TrainConfig};
use storypoint::{Estimator, ModelLoader, RecordStore, StoryPoints};

fn trained_loader(dir: &std::path::Path, algorithm: Algorithm) -> Arc<ModelLoader> {
    let config = TrainConfig {
        vectorizer_path: dir.join("ml_artifacts/vectorizer.json"),
        model_path: dir.join("ml_artifacts/model.json"),
        algorithm,
        ..TrainConfig::default()
    };
    train(&config, &[]).unwrap();

    let loader = Arc::new(ModelLoader::new());
    loader
        .load(&config.vectorizer_path, &config.model_path)
        .unwrap();
    loader
}

#[test]
fn test_trained_model_estimates_on_scale() {
    let dir = tempfile::tempdir().unwrap();
    let estimator = Estimator::new(trained_loader(dir.path(), Algorithm::GradientBoosting));

    let result = estimator
        .estimate("As a user, I want to reset my password")
        .unwrap();
    assert!(StoryPoints::SCALE.contains(&result.predicted_points));
    assert_eq!(result.model_used, "GradientBoostingRegressor");

    // Text with no known vocabulary still produces an estimate
    let result = estimator.estimate("zzzz qqqq").unwrap();
    assert!(StoryPoints::SCALE.contains(&result.predicted_points));
}

#[test]
fn test_concurrent_estimates_and_appends() {
    let dir = tempfile::tempdir().unwrap();
    let estimator = Estimator::new(trained_loader(dir.path(), Algorithm::Ridge));
    let store = RecordStore::open(dir.path().join("data")).unwrap();

    let threads = 8;
    let per_thread = 25;
    thread::scope(|scope| {
        for t in 0..threads {
            let estimator = &estimator;
            let store = &store;
            scope.spawn(move || {
                for i in 0..per_thread {
                    let story = format!("As a user, I want report number {} from worker {}", i, t);
                    let result = estimator.estimate(&story).unwrap();
                    store
                        .append_prediction(
                            &story,
                            result.predicted_points,
                            result.confidence,
                            &result.model_used,
                        )
                        .unwrap();
                }
            });
        }
    });

    let records = store.recent_predictions(usize::MAX);
    assert_eq!(records.len(), threads * per_thread);

    // Every line after the header is a whole record
    let history = std::fs::read_to_string(store.history_path()).unwrap();
    assert_eq!(history.lines().count(), threads * per_thread + 1);
    for line in history.lines().skip(1) {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["model"], "LinearRegressor");
    }
}

#[test]
fn test_unloaded_estimator_reports_model_not_loaded() {
    let estimator = Estimator::new(Arc::new(ModelLoader::new()));
    let err = estimator.estimate("As a user, I want to log in").unwrap_err();
    assert!(matches!(err, storypoint::EstimatorError::ModelNotLoaded));
}
