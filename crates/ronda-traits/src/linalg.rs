//! Least-squares regression for weight estimation.

use ndarray::{Array1, Array2};

use crate::error::{Result, RondaError};

/// Pivot magnitude below which a system is treated as singular.
const SINGULAR_PIVOT: f64 = 1e-14;

/// Result of an ordinary least squares fit.
#[derive(Debug, Clone)]
pub struct OlsResult {
    /// Intercept (0 when fitted without one).
    pub intercept: f64,
    /// Slope coefficients, one per column of the design matrix.
    pub coefficients: Array1<f64>,
    /// In-sample R-squared.
    pub r_squared: f64,
}

impl OlsResult {
    /// Fitted values for a design matrix with the same columns.
    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }
}

/// Fit `y = intercept + X beta` by least squares.
///
/// Solves the normal equations `(X'X + alpha I) beta = X'y`. With
/// `fit_intercept` the columns and target are centered first so the
/// intercept is not penalized.
///
/// # Errors
///
/// Returns [`RondaError::Model`] for mismatched dimensions, empty input or a
/// singular system.
pub fn ols(y: &Array1<f64>, x: &Array2<f64>, fit_intercept: bool, alpha: f64) -> Result<OlsResult> {
    let n = y.len();
    let p = x.ncols();
    if x.nrows() != n {
        return Err(RondaError::Model(format!(
            "design matrix has {} rows, target has {n}",
            x.nrows()
        )));
    }
    if n == 0 || p == 0 {
        return Err(RondaError::Model("empty regression input".into()));
    }

    let (x_mean, y_mean) = if fit_intercept {
        (
            x.mean_axis(ndarray::Axis(0))
                .unwrap_or_else(|| Array1::zeros(p)),
            y.mean().unwrap_or(0.0),
        )
    } else {
        (Array1::zeros(p), 0.0)
    };

    let xc = x - &x_mean;
    let yc = y - y_mean;

    let mut xtx = xc.t().dot(&xc);
    for j in 0..p {
        xtx[[j, j]] += alpha.max(0.0);
    }
    let xty = xc.t().dot(&yc);
    let coefficients = solve_linear_system(&xtx, &xty)?;
    let intercept = y_mean - x_mean.dot(&coefficients);

    let fitted = x.dot(&coefficients) + intercept;
    let r_squared = r_squared(y, &fitted);

    Ok(OlsResult {
        intercept,
        coefficients,
        r_squared,
    })
}

/// Coefficient of determination of `fitted` against `y`; 0 when `y` is constant.
pub fn r_squared(y: &Array1<f64>, fitted: &Array1<f64>) -> f64 {
    let y_mean = y.mean().unwrap_or(0.0);
    let ss_tot: f64 = y.iter().map(|yi| (yi - y_mean).powi(2)).sum();
    let ss_res: f64 = y.iter().zip(fitted).map(|(yi, fi)| (yi - fi).powi(2)).sum();
    if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 }
}

/// Solve a linear system Ax = b using Gaussian elimination with partial pivoting.
pub fn solve_linear_system(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    if n == 0 {
        return Err(RondaError::Model("empty system".into()));
    }
    if a.ncols() != n || b.len() != n {
        return Err(RondaError::Model("system must be square".into()));
    }

    // Augmented matrix [A | b]
    let mut aug = Array2::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[[col, col]].abs();
        for row in (col + 1)..n {
            if aug[[row, col]].abs() > max_val {
                max_val = aug[[row, col]].abs();
                max_row = row;
            }
        }

        if max_val.is_nan() || max_val < SINGULAR_PIVOT {
            return Err(RondaError::Model(
                "matrix is singular or nearly singular".to_string(),
            ));
        }

        if max_row != col {
            for j in 0..=n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        for row in (col + 1)..n {
            let factor = aug[[row, col]] / aug[[col, col]];
            for j in col..=n {
                aug[[row, j]] -= factor * aug[[col, j]];
            }
        }
    }

    // Back substitution
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = aug[[i, n]];
        for j in (i + 1)..n {
            sum -= aug[[i, j]] * x[j];
        }
        x[i] = sum / aug[[i, i]];
    }

    Ok(x)
}
