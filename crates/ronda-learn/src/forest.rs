//! Bootstrap-aggregated regression trees.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use ronda_traits::{Hyperparams, ModelKind, Result};

use crate::model::{Regressor, check_columns, check_input, normalize_importances, not_fitted};
use crate::tree::{RegressionTree, TreeParams};

/// Random forest settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    /// Number of trees.
    pub n_estimators: usize,
    /// Per-tree growth limits.
    pub tree: TreeParams,
    /// Seed of tree `i` is `seed + i`.
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            tree: TreeParams::default(),
            seed: 42,
        }
    }
}

/// Random forest regressor.
///
/// Each tree is grown on a bootstrap sample drawn with its own seeded
/// [`StdRng`], so the fitted forest depends only on the data and `seed`,
/// not on how rayon schedules the trees. Feature weights are the mean
/// normalized impurity decrease across trees.
#[derive(Debug, Clone, Default)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Unfitted forest.
    pub const fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    /// Reads `n_estimators`, `max_depth`, `min_samples_leaf` and `max_features`.
    pub fn from_params(params: &Hyperparams, seed: u64) -> Self {
        let d = ForestParams::default();
        Self::new(ForestParams {
            n_estimators: params.usize_or("n_estimators", d.n_estimators, 1),
            tree: TreeParams {
                max_depth: params.usize_or("max_depth", d.tree.max_depth, 1),
                min_samples_leaf: params.usize_or("min_samples_leaf", d.tree.min_samples_leaf, 1),
                max_features: params
                    .0
                    .get("max_features")
                    .map(|_| params.usize_or("max_features", 1, 1)),
            },
            seed,
        })
    }

    /// Number of fitted trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_input(x, y)?;
        let n = x.nrows();
        let params = self.params;

        self.trees = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &rows, &params.tree, &mut rng)
            })
            .collect();
        self.n_features = x.ncols();
        tracing::debug!(trees = self.trees.len(), rows = n, "random forest fitted");
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(not_fitted());
        }
        check_columns(x, self.n_features)?;
        let mut out = Array1::zeros(x.nrows());
        for tree in &self.trees {
            out += &tree.predict(x);
        }
        Ok(out / self.trees.len() as f64)
    }

    fn feature_weights(&self) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(not_fitted());
        }
        let mut total = Array1::zeros(self.n_features);
        for tree in &self.trees {
            let raw = tree.importances();
            let sum = raw.sum();
            if sum > 0.0 {
                total += &(raw / sum);
            }
        }
        Ok(normalize_importances(total))
    }

    fn kind(&self) -> ModelKind {
        ModelKind::RandomForest
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((120, 3), |(i, j)| {
            let i = i as f64;
            match j {
                0 => (i * 0.37).sin(),
                1 => (i * 0.73).cos(),
                _ => (i * 1.31).sin(),
            }
        });
        let y = x.column(0).mapv(|v| 2.0 * v) + x.column(1).mapv(|v| 0.2 * v);
        (x, y)
    }

    fn small(seed: u64) -> RandomForest {
        RandomForest::new(ForestParams {
            n_estimators: 20,
            tree: TreeParams {
                max_depth: 4,
                min_samples_leaf: 3,
                max_features: Some(2),
            },
            seed,
        })
    }

    #[test]
    fn test_weights_nonnegative_sum_to_one() {
        let (x, y) = data();
        let mut forest = small(42);
        forest.fit(&x, &y).unwrap();
        let w = forest.feature_weights().unwrap();
        assert!(w.iter().all(|v| *v >= 0.0));
        assert_abs_diff_eq!(w.sum(), 1.0, epsilon = 1e-9);
        assert!(w[0] > w[2]);
        assert_eq!(forest.n_trees(), 20);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = data();
        let mut a = small(7);
        let mut b = small(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.feature_weights().unwrap(), b.feature_weights().unwrap());
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_from_params() {
        let params = Hyperparams::default()
            .with("n_estimators", 3.0)
            .with("max_features", 1.0);
        let forest = RandomForest::from_params(&params, 1);
        assert_eq!(forest.params.n_estimators, 3);
        assert_eq!(forest.params.tree.max_features, Some(1));
        assert!(forest.predict(&Array2::zeros((1, 1))).is_err());
    }
}
