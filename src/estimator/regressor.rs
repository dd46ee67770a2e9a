//! Regressor artifacts
//!
//! Wraps the `gbdt` crate for gradient boosted trees and a ridge regression
//! solved with `nalgebra`. Both are saved as one JSON artifact tagged with
//! the algorithm name, which doubles as the model identity reported with
//! every estimate.
//!
//! Note: the gbdt crate works in `f32` (`ValueType`) while features and
//! predictions here are `f64`. Conversions happen at the crate boundary.

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Artifact format version written by the trainer
pub const REGRESSOR_VERSION: u32 = 1;

#[inline]
fn features_to_f32(features: &[f64]) -> Vec<f32> {
    features.iter().map(|&v| v as f32).collect()
}

/// Hyperparameters for gradient boosted trees
#[derive(Debug, Clone)]
pub struct GbdtParams {
    pub trees: usize,
    pub max_depth: u32,
    pub learning_rate: f64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            trees: 100,
            max_depth: 6,
            learning_rate: 0.1,
        }
    }
}

/// A fitted regressor
#[derive(Serialize, Deserialize)]
#[serde(tag = "algorithm")]
pub enum Regressor {
    GradientBoostingRegressor { trees: GBDT },
    LinearRegressor { weights: Vec<f64>, intercept: f64 },
}

impl Regressor {
    /// Human-readable algorithm class, used for auditing only
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            Regressor::GradientBoostingRegressor { .. } => "GradientBoostingRegressor",
            Regressor::LinearRegressor { .. } => "LinearRegressor",
        }
    }

    /// Scalar prediction for one feature vector
    pub fn predict(&self, features: &[f64]) -> f64 {
        match self {
            Regressor::GradientBoostingRegressor { trees } => {
                let data = vec![Data::new_test_data(features_to_f32(features), None)];
                trees.predict(&data).first().copied().unwrap_or(0.0) as f64
            }
            Regressor::LinearRegressor { weights, intercept } => {
                intercept
                    + weights
                        .iter()
                        .zip(features)
                        .map(|(w, x)| w * x)
                        .sum::<f64>()
            }
        }
    }

    /// Fit gradient boosted trees with squared-error loss.
    pub fn fit_gradient_boosting(
        rows: &[Vec<f64>],
        targets: &[f64],
        feature_count: usize,
        params: &GbdtParams,
    ) -> Result<Self, String> {
        check_shapes(rows, targets, feature_count)?;

        let mut cfg = Config::new();
        cfg.set_feature_size(feature_count);
        cfg.set_max_depth(params.max_depth);
        cfg.set_iterations(params.trees);
        cfg.set_shrinkage(params.learning_rate as f32);
        cfg.set_loss("SquaredError");
        cfg.set_debug(false);
        cfg.set_training_optimization_level(2);
        cfg.set_min_leaf_size(1);

        let mut gbdt = GBDT::new(&cfg);
        let mut training_data: DataVec = rows
            .iter()
            .zip(targets)
            .map(|(row, &y)| Data::new_training_data(features_to_f32(row), 1.0, y as f32, None))
            .collect();

        gbdt.fit(&mut training_data);

        Ok(Regressor::GradientBoostingRegressor { trees: gbdt })
    }

    /// Fit ridge regression with an unpenalized intercept.
    ///
    /// Solves `(XcᵀXc + αI) w = Xcᵀyc` on centered data by Cholesky
    /// decomposition. `alpha` must be positive.
    pub fn fit_ridge(
        rows: &[Vec<f64>],
        targets: &[f64],
        feature_count: usize,
        alpha: f64,
    ) -> Result<Self, String> {
        check_shapes(rows, targets, feature_count)?;
        if alpha.is_nan() || alpha <= 0.0 {
            return Err(format!("ridge alpha must be positive, got {alpha}"));
        }

        let n = rows.len();
        let x = DMatrix::<f64>::from_fn(n, feature_count, |i, j| rows[i][j]);
        let y = DVector::<f64>::from_column_slice(targets);

        let x_mean = DVector::<f64>::from_fn(feature_count, |j, _| x.column(j).mean());
        let y_mean = y.mean();

        let mut centered = x;
        for j in 0..feature_count {
            centered.column_mut(j).add_scalar_mut(-x_mean[j]);
        }
        let y_centered = y.add_scalar(-y_mean);

        let gram = centered.transpose() * &centered
            + DMatrix::<f64>::identity(feature_count, feature_count) * alpha;
        let rhs = centered.transpose() * y_centered;

        let weights = gram
            .cholesky()
            .ok_or_else(|| "ridge system is not positive definite".to_string())?
            .solve(&rhs);
        let intercept = y_mean - x_mean.dot(&weights);

        Ok(Regressor::LinearRegressor {
            weights: weights.iter().copied().collect(),
            intercept,
        })
    }
}

fn check_shapes(rows: &[Vec<f64>], targets: &[f64], feature_count: usize) -> Result<(), String> {
    if rows.is_empty() {
        return Err("no training samples provided".into());
    }
    if rows.len() != targets.len() {
        return Err(format!(
            "sample count ({}) does not match target count ({})",
            rows.len(),
            targets.len()
        ));
    }
    if let Some(bad) = rows.iter().position(|r| r.len() != feature_count) {
        return Err(format!(
            "sample {bad} has {} features, expected {feature_count}",
            rows[bad].len()
        ));
    }
    Ok(())
}

/// On-disk envelope for a fitted regressor
#[derive(Serialize, Deserialize)]
pub struct RegressorArtifact {
    pub version: u32,
    /// Width of the feature vectors the model was fitted on
    pub feature_count: usize,
    pub model: Regressor,
}

impl RegressorArtifact {
    pub fn new(feature_count: usize, model: Regressor) -> Self {
        Self {
            version: REGRESSOR_VERSION,
            feature_count,
            model,
        }
    }

    /// Check the artifact is internally consistent
    pub fn validate(&self) -> Result<(), String> {
        if self.version != REGRESSOR_VERSION {
            return Err(format!(
                "unsupported regressor version {} (expected {})",
                self.version, REGRESSOR_VERSION
            ));
        }
        match &self.model {
            Regressor::LinearRegressor { weights, .. } => {
                if weights.len() != self.feature_count {
                    return Err(format!(
                        "linear model has {} weights but declares {} features",
                        weights.len(),
                        self.feature_count
                    ));
                }
                Ok(())
            }
            Regressor::GradientBoostingRegressor { trees } => {
                check_tree_features(trees, self.feature_count)
            }
        }
    }
}

/// Reject tree ensembles that gbdt would panic on at predict time.
///
/// The tree internals are private to gbdt, so this walks their serialized
/// form: the iteration count must match the number of trees, every tree
/// needs a root, and no split may read a column past `feature_count`.
fn check_tree_features(model: &GBDT, feature_count: usize) -> Result<(), String> {
    let value = serde_json::to_value(model).map_err(|e| format!("unreadable tree model: {e}"))?;
    let trees = value
        .get("trees")
        .and_then(Value::as_array)
        .ok_or("tree model has no tree list")?;

    let iterations = value.pointer("/conf/iterations").and_then(Value::as_u64);
    if iterations != Some(trees.len() as u64) {
        return Err(format!(
            "tree model declares {} iterations but holds {} trees",
            iterations.map_or_else(|| "no".to_string(), |n| n.to_string()),
            trees.len()
        ));
    }

    for (t, tree) in trees.iter().enumerate() {
        let nodes = tree
            .pointer("/tree/tree")
            .and_then(Value::as_array)
            .ok_or_else(|| format!("tree {t} has no node list"))?;
        if nodes.is_empty() {
            return Err(format!("tree {t} has no root node"));
        }
        for node in nodes {
            let is_leaf = node
                .pointer("/value/is_leaf")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if is_leaf {
                continue;
            }
            let index = node
                .pointer("/value/feature_index")
                .and_then(Value::as_u64)
                .ok_or_else(|| format!("tree {t} has a split without a feature index"))?;
            if index >= feature_count as u64 {
                return Err(format!(
                    "tree {t} splits on feature {index} but the artifact declares {feature_count} features"
                ));
            }
        }
    }
    Ok(())
}
