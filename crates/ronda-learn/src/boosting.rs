//! Gradient-boosted regression trees (squared loss).

use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use ronda_traits::{Hyperparams, ModelKind, Result};

use crate::model::{Regressor, check_columns, check_input, normalize_importances, not_fitted};
use crate::tree::{RegressionTree, TreeParams};

/// Gradient boosting settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    /// Number of boosting stages.
    pub n_estimators: usize,
    /// Shrinkage applied to each stage.
    pub learning_rate: f64,
    /// Per-stage tree limits.
    pub tree: TreeParams,
    /// Fraction of rows drawn (without replacement) for each stage.
    pub subsample: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            tree: TreeParams {
                max_depth: 3,
                min_samples_leaf: 5,
                max_features: None,
            },
            subsample: 1.0,
        }
    }
}

/// Gradient boosting regressor.
///
/// Starts from the mean target and adds shrunken trees fitted to the
/// current residuals. Feature weights are the normalized total impurity
/// decrease over all stages.
#[derive(Debug, Clone, Default)]
pub struct GradientBoosting {
    params: BoostingParams,
    seed: u64,
    init: f64,
    stages: Vec<RegressionTree>,
    n_features: usize,
}

impl GradientBoosting {
    /// Unfitted model.
    pub const fn new(params: BoostingParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            init: 0.0,
            stages: Vec::new(),
            n_features: 0,
        }
    }

    /// Reads `n_estimators`, `learning_rate`, `max_depth`, `min_samples_leaf` and `subsample`.
    pub fn from_params(params: &Hyperparams, seed: u64) -> Self {
        let d = BoostingParams::default();
        Self::new(
            BoostingParams {
                n_estimators: params.usize_or("n_estimators", d.n_estimators, 1),
                learning_rate: params.get_or("learning_rate", d.learning_rate).clamp(1e-6, 1.0),
                tree: TreeParams {
                    max_depth: params.usize_or("max_depth", d.tree.max_depth, 1),
                    min_samples_leaf: params.usize_or("min_samples_leaf", d.tree.min_samples_leaf, 1),
                    max_features: None,
                },
                subsample: params.get_or("subsample", d.subsample).clamp(0.05, 1.0),
            },
            seed,
        )
    }

    /// Number of fitted stages.
    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }
}

impl Regressor for GradientBoosting {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_input(x, y)?;
        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let sample_size = ((n as f64 * self.params.subsample).ceil() as usize).clamp(1, n);

        self.init = y.mean().unwrap_or(0.0);
        let mut current = Array1::from_elem(n, self.init);
        let mut all_rows: Vec<usize> = (0..n).collect();
        self.stages.clear();

        for _ in 0..self.params.n_estimators {
            let residual = y - &current;
            let rows: Vec<usize> = if sample_size < n {
                all_rows.shuffle(&mut rng);
                let mut rows = all_rows[..sample_size].to_vec();
                rows.sort_unstable();
                rows
            } else {
                all_rows.clone()
            };
            let tree = RegressionTree::fit(x, &residual, &rows, &self.params.tree, &mut rng);
            current = current + tree.predict(x) * self.params.learning_rate;
            self.stages.push(tree);
        }
        self.n_features = x.ncols();
        tracing::debug!(stages = self.stages.len(), rows = n, "gradient boosting fitted");
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.stages.is_empty() {
            return Err(not_fitted());
        }
        check_columns(x, self.n_features)?;
        let mut out = Array1::from_elem(x.nrows(), self.init);
        for tree in &self.stages {
            out = out + tree.predict(x) * self.params.learning_rate;
        }
        Ok(out)
    }

    fn feature_weights(&self) -> Result<Array1<f64>> {
        if self.stages.is_empty() {
            return Err(not_fitted());
        }
        let mut total = Array1::zeros(self.n_features);
        for tree in &self.stages {
            total += tree.importances();
        }
        Ok(normalize_importances(total))
    }

    fn kind(&self) -> ModelKind {
        ModelKind::GradientBoosting
    }
}
