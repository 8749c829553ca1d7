//! Linear (optionally ridge) regression.

use ndarray::{Array1, Array2};
use ronda_traits::linalg::{OlsResult, ols};
use ronda_traits::{Hyperparams, ModelKind, Result};

use crate::model::{Regressor, check_columns, check_input, not_fitted};

/// Least squares with an intercept and an optional ridge penalty `alpha`.
///
/// Its feature weights are the signed slope coefficients.
#[derive(Debug, Clone, Default)]
pub struct LinearModel {
    alpha: f64,
    fit: Option<OlsResult>,
}

impl LinearModel {
    /// Unfitted model with ridge penalty `alpha` (0 for plain OLS).
    pub const fn new(alpha: f64) -> Self {
        Self { alpha, fit: None }
    }

    /// Reads `alpha` (default 0).
    pub fn from_params(params: &Hyperparams) -> Self {
        Self::new(params.get_or("alpha", 0.0).max(0.0))
    }

    /// Fitted intercept.
    pub fn intercept(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.intercept)
    }
}

impl Regressor for LinearModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_input(x, y)?;
        self.fit = Some(ols(y, x, true, self.alpha)?);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let fit = self.fit.as_ref().ok_or_else(not_fitted)?;
        check_columns(x, fit.coefficients.len())?;
        Ok(fit.predict(x))
    }

    fn feature_weights(&self) -> Result<Array1<f64>> {
        self.fit
            .as_ref()
            .map(|f| f.coefficients.clone())
            .ok_or_else(not_fitted)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Linear
    }
}
