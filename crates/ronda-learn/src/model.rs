//! The regression model interface shared by every learner.

use std::fmt;

use ndarray::{Array1, Array2};
use ronda_traits::{Hyperparams, ModelKind, Result, RondaError};

use crate::boosting::GradientBoosting;
use crate::forest::RandomForest;
use crate::linear::LinearModel;
use crate::network::Mlp;

/// A model mapping factor values to forward returns.
///
/// Implementations are fitted once and then queried. All of them are
/// deterministic given their hyperparameters and seed.
pub trait Regressor: Send + Sync + fmt::Debug {
    /// Fit on rows of `x` (one column per factor) against `y`.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Model`] for mismatched or empty input, or when
    /// the fit itself fails.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predictions for each row of `x`.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Model`] when called before [`Regressor::fit`]
    /// or with the wrong number of columns.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// One weight per feature.
    ///
    /// Linear models return signed coefficients. Tree ensembles and networks
    /// return non-negative importances summing to 1.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Model`] when called before [`Regressor::fit`].
    fn feature_weights(&self) -> Result<Array1<f64>>;

    /// Which model family this is.
    fn kind(&self) -> ModelKind;
}

/// An unfitted model of `kind` configured from `params`.
pub fn build(kind: ModelKind, params: &Hyperparams, seed: u64) -> Box<dyn Regressor> {
    match kind {
        ModelKind::Linear => Box::new(LinearModel::from_params(params)),
        ModelKind::RandomForest => Box::new(RandomForest::from_params(params, seed)),
        ModelKind::GradientBoosting => Box::new(GradientBoosting::from_params(params, seed)),
        ModelKind::Mlp => Box::new(Mlp::from_params(params, seed)),
    }
}

/// Mean squared error.
pub fn mse(y: &Array1<f64>, predicted: &Array1<f64>) -> f64 {
    if y.is_empty() {
        return f64::NAN;
    }
    (y - predicted).mapv(|e| e * e).sum() / y.len() as f64
}

pub(crate) fn check_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(RondaError::Model(format!(
            "{} feature rows but {} targets",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(RondaError::Model("empty training set".into()));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(RondaError::Model("non-finite training value".into()));
    }
    Ok(())
}

pub(crate) fn check_columns(x: &Array2<f64>, expected: usize) -> Result<()> {
    if x.ncols() == expected {
        Ok(())
    } else {
        Err(RondaError::Model(format!(
            "model fitted on {expected} features, got {}",
            x.ncols()
        )))
    }
}

pub(crate) fn not_fitted() -> RondaError {
    RondaError::Model("model is not fitted".into())
}

/// Scale non-negative raw importances to sum to 1; uniform when all are zero.
pub(crate) fn normalize_importances(raw: Array1<f64>) -> Array1<f64> {
    let total = raw.sum();
    if total > 0.0 && total.is_finite() {
        raw / total
    } else {
        let p = raw.len().max(1);
        Array1::from_elem(raw.len(), 1.0 / p as f64)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn test_mse() {
        assert_abs_diff_eq!(mse(&array![1.0, 2.0], &array![1.0, 4.0]), 2.0);
        assert!(mse(&Array1::zeros(0), &Array1::zeros(0)).is_nan());
    }

    #[test]
    fn test_normalize_importances() {
        let w = normalize_importances(array![1.0, 3.0]);
        assert_abs_diff_eq!(w[1], 0.75);
        let flat = normalize_importances(array![0.0, 0.0, 0.0, 0.0]);
        assert_abs_diff_eq!(flat.sum(), 1.0);
    }

    #[test]
    fn test_build_kinds() {
        for kind in [
            ModelKind::Linear,
            ModelKind::RandomForest,
            ModelKind::GradientBoosting,
            ModelKind::Mlp,
        ] {
            let model = build(kind, &Hyperparams::default(), 7);
            assert_eq!(model.kind(), kind);
            assert!(model.feature_weights().is_err());
        }
    }
}
