//! CART regression trees, the building block of both ensembles.

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Growth limits of one tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    /// Maximum depth; a depth-0 tree is a single leaf.
    pub max_depth: usize,
    /// Minimum number of rows in each leaf.
    pub min_samples_leaf: usize,
    /// Features considered per split, drawn at random; `None` means all.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 6,
            min_samples_leaf: 5,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 0,
            Self::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// A fitted regression tree.
///
/// Splits minimize the summed squared error of the two children. The
/// reduction each split achieves is credited to its feature.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: Node,
    importances: Array1<f64>,
}

impl RegressionTree {
    /// Grow a tree on the given `rows` of `x` and `y`.
    ///
    /// `rows` may repeat indices (bootstrap samples). `rng` is only used to
    /// draw feature subsets when `max_features` is below the column count.
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut builder = Builder {
            x,
            y,
            params,
            importances: Array1::zeros(x.ncols()),
        };
        let root = builder.grow(rows, 0, rng);
        Self {
            root,
            importances: builder.importances,
        }
    }

    /// Prediction for one feature row.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(v) => return *v,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Predictions for every row of `x`.
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|r| self.predict_row(r)).collect()
    }

    /// Total squared-error reduction per feature (unnormalized).
    pub const fn importances(&self) -> &Array1<f64> {
        &self.importances
    }

    /// Depth of the deepest leaf.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    params: &'a TreeParams,
    importances: Array1<f64>,
}

struct BestSplit {
    gain: f64,
    feature: usize,
    threshold: f64,
}

impl Builder<'_> {
    fn grow(&mut self, rows: &[usize], depth: usize, rng: &mut StdRng) -> Node {
        let n = rows.len();
        let (sum, sum_sq) = rows.iter().fold((0.0, 0.0), |(s, q), &i| {
            let v = self.y[i];
            (s + v, q + v * v)
        });
        let mean = if n == 0 { 0.0 } else { sum / n as f64 };
        let min_leaf = self.params.min_samples_leaf.max(1);

        if depth >= self.params.max_depth || n < 2 * min_leaf {
            return Node::Leaf(mean);
        }
        let sse = sum_sq - sum * sum / n as f64;
        if sse <= 1e-12 {
            return Node::Leaf(mean);
        }

        let Some(best) = self.best_split(rows, sum, sum_sq, sse, min_leaf, rng) else {
            return Node::Leaf(mean);
        };
        self.importances[best.feature] += best.gain;

        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&i| self.x[[i, best.feature]] <= best.threshold);
        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.grow(&left, depth + 1, rng)),
            right: Box::new(self.grow(&right, depth + 1, rng)),
        }
    }

    fn best_split(
        &self,
        rows: &[usize],
        sum: f64,
        sum_sq: f64,
        sse: f64,
        min_leaf: usize,
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let n = rows.len();
        let p = self.x.ncols();
        let mut features: Vec<usize> = (0..p).collect();
        if let Some(k) = self.params.max_features
            && k < p
        {
            features.shuffle(rng);
            features.truncate(k.max(1));
        }

        let mut best: Option<BestSplit> = None;
        let mut sorted = rows.to_vec();
        for &f in &features {
            sorted.sort_by(|&a, &b| self.x[[a, f]].total_cmp(&self.x[[b, f]]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..n - 1 {
                let i = sorted[k];
                let yi = self.y[i];
                left_sum += yi;
                left_sq += yi * yi;

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let here = self.x[[i, f]];
                let next = self.x[[sorted[k + 1], f]];
                if next <= here {
                    continue;
                }

                let right_sum = sum - left_sum;
                let right_sq = sum_sq - left_sq;
                let child_sse = (left_sq - left_sum * left_sum / n_left as f64)
                    + (right_sq - right_sum * right_sum / n_right as f64);
                let gain = sse - child_sse;
                if gain > 1e-15 && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(BestSplit {
                        gain,
                        feature: f,
                        threshold: 0.5 * (here + next),
                    });
                }
            }
        }
        best
    }
}
