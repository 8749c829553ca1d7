//! One-hidden-layer perceptron regressor.

use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use ronda_traits::stats::MIN_STD_THRESHOLD;
use ronda_traits::{Hyperparams, ModelKind, Result, RondaError};

use crate::model::{Regressor, check_columns, check_input, normalize_importances, not_fitted};

/// Network settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MlpParams {
    /// Hidden units (tanh).
    pub hidden: usize,
    /// Gradient descent step size.
    pub learning_rate: f64,
    /// Full-batch passes over the data.
    pub epochs: usize,
    /// L2 penalty on the weights.
    pub l2: f64,
}

impl Default for MlpParams {
    fn default() -> Self {
        Self {
            hidden: 8,
            learning_rate: 0.05,
            epochs: 500,
            l2: 1e-4,
        }
    }
}

#[derive(Debug, Clone)]
struct Weights {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array1<f64>,
    b2: f64,
    y_mean: f64,
    y_std: f64,
}

impl Weights {
    fn hidden(&self, x: &Array2<f64>) -> Array2<f64> {
        (x.dot(&self.w1.t()) + &self.b1).mapv(f64::tanh)
    }
}

/// Single hidden layer network with a linear output, trained by full-batch
/// gradient descent on squared error.
///
/// The target is standardized internally. Feature weights are Garson
/// connection-weight importances: non-negative and summing to 1, so they
/// carry no direction of effect.
#[derive(Debug, Clone, Default)]
pub struct Mlp {
    params: MlpParams,
    seed: u64,
    weights: Option<Weights>,
}

impl Mlp {
    /// Unfitted network.
    pub const fn new(params: MlpParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            weights: None,
        }
    }

    /// Reads `hidden`, `learning_rate`, `epochs` and `l2`.
    pub fn from_params(params: &Hyperparams, seed: u64) -> Self {
        let d = MlpParams::default();
        Self::new(
            MlpParams {
                hidden: params.usize_or("hidden", d.hidden, 1),
                learning_rate: params.get_or("learning_rate", d.learning_rate).max(1e-6),
                epochs: params.usize_or("epochs", d.epochs, 1),
                l2: params.get_or("l2", d.l2).max(0.0),
            },
            seed,
        )
    }
}

impl Regressor for Mlp {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_input(x, y)?;
        let (n, p) = x.dim();
        let h = self.params.hidden;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let init = Normal::new(0.0, (1.0 / p as f64).sqrt())
            .map_err(|e| RondaError::Model(e.to_string()))?;

        let y_mean = y.mean().unwrap_or(0.0);
        let y_std = y.std(1.0);
        let y_std = if y_std.is_finite() && y_std > MIN_STD_THRESHOLD { y_std } else { 1.0 };
        let target = (y - y_mean) / y_std;

        let mut w = Weights {
            w1: Array2::from_shape_fn((h, p), |_| init.sample(&mut rng)),
            b1: Array1::zeros(h),
            w2: Array1::from_shape_fn(h, |_| init.sample(&mut rng) / (h as f64).sqrt()),
            b2: 0.0,
            y_mean,
            y_std,
        };

        let lr = self.params.learning_rate;
        let l2 = self.params.l2;
        let scale = 2.0 / n as f64;
        for _ in 0..self.params.epochs {
            let a = w.hidden(x);
            let out = a.dot(&w.w2) + w.b2;
            let d_out = (out - &target) * scale;

            let g_w2 = a.t().dot(&d_out) + &w.w2 * (2.0 * l2);
            let g_b2 = d_out.sum();

            // back through tanh: (1 - a^2) * d_out * w2
            let mut d_z = a.mapv(|v| 1.0 - v * v);
            for (mut row, &d) in d_z.axis_iter_mut(Axis(0)).zip(d_out.iter()) {
                row *= &(&w.w2 * d);
            }
            let g_w1 = d_z.t().dot(x) + &w.w1 * (2.0 * l2);
            let g_b1 = d_z.sum_axis(Axis(0));

            w.w2 -= &(g_w2 * lr);
            w.b2 -= g_b2 * lr;
            w.w1 -= &(g_w1 * lr);
            w.b1 -= &(g_b1 * lr);
        }

        if w.w1.iter().chain(w.w2.iter()).any(|v| !v.is_finite()) {
            return Err(RondaError::Model("network training diverged".into()));
        }
        tracing::debug!(hidden = h, epochs = self.params.epochs, "network fitted");
        self.weights = Some(w);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let w = self.weights.as_ref().ok_or_else(not_fitted)?;
        check_columns(x, w.w1.ncols())?;
        let out = w.hidden(x).dot(&w.w2) + w.b2;
        Ok(out * w.y_std + w.y_mean)
    }

    fn feature_weights(&self) -> Result<Array1<f64>> {
        let w = self.weights.as_ref().ok_or_else(not_fitted)?;
        let mut raw = Array1::zeros(w.w1.ncols());
        for (row, out_w) in w.w1.axis_iter(Axis(0)).zip(w.w2.iter()) {
            let abs_row = row.mapv(f64::abs);
            let row_total = abs_row.sum();
            if row_total > 0.0 {
                raw += &(abs_row * (out_w.abs() / row_total));
            }
        }
        Ok(normalize_importances(raw))
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Mlp
    }
}
