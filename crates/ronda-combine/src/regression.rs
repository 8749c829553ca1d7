//! Regression-derived weights.

use ronda_traits::linalg::ols;
use ronda_traits::{
    Diagnostics, EvalContext, FactorSeries, NormalizeMethod, Normalizer, Panel, Result,
    ReturnSeries,
};

use crate::combiner::{Combination, Combiner, combine_weighted};
use crate::weights::WeightVector;

/// Output of [`RegressionCombiner::fit`] beyond the combination itself.
#[derive(Debug, Clone)]
pub struct RegressionFit {
    /// Composite, weights and diagnostics.
    pub combination: Combination,
    /// Fitted intercept.
    pub intercept: f64,
    /// In-sample R-squared of the fit.
    pub r_squared: f64,
    /// Number of `(instrument, date)` rows used.
    pub n_obs: usize,
}

/// Weights factors by an OLS fit of forward returns on the standardized factors.
///
/// The coefficients keep their sign: a factor that predicts returns
/// inversely gets a negative weight.
#[derive(Debug, Clone)]
pub struct RegressionCombiner {
    ctx: EvalContext,
    returns: ReturnSeries,
}

impl RegressionCombiner {
    /// Combiner that regresses on `returns` whenever [`Combiner::combine`] is called.
    pub fn new(ctx: &EvalContext, returns: ReturnSeries) -> Self {
        Self {
            ctx: ctx.clone(),
            returns,
        }
    }

    /// Standardize `factors` along the configured axis, regress `returns` on
    /// them with an intercept, and combine them with the coefficients.
    ///
    /// # Errors
    ///
    /// - [`RondaError::KeyMismatch`](ronda_traits::RondaError::KeyMismatch)
    ///   when factors and returns share no key
    /// - [`RondaError::Model`](ronda_traits::RondaError::Model) when the
    ///   factors are collinear
    pub fn fit(&self, factors: &[FactorSeries], returns: &ReturnSeries) -> Result<RegressionFit> {
        let _span = self.ctx.enter("regression");
        let axis = self.ctx.config().normalization.axis;
        let normalizer = Normalizer::new(&self.ctx);
        let mut diagnostics = Diagnostics::new();

        let standardized: Vec<FactorSeries> = factors
            .iter()
            .map(|f| {
                let n = normalizer.normalize(f, axis, NormalizeMethod::Standardize);
                diagnostics.merge(n.diagnostics);
                n.series
            })
            .collect();

        let panel = Panel::new(&standardized, Some(returns.series()))?;
        let fit = ols(panel.target()?, panel.features(), true, 0.0)?;
        let weights = WeightVector::new(
            panel
                .names()
                .iter()
                .zip(fit.coefficients.iter())
                .map(|(name, &c)| (name.as_str(), c)),
        )?;
        tracing::debug!(
            rows = panel.len(),
            r_squared = fit.r_squared,
            ?weights,
            "regression weights fitted"
        );

        let composite = combine_weighted(&standardized, &weights, self.name())?;
        Ok(RegressionFit {
            combination: Combination {
                composite,
                weights,
                diagnostics,
            },
            intercept: fit.intercept,
            r_squared: fit.r_squared,
            n_obs: panel.len(),
        })
    }
}

impl Combiner for RegressionCombiner {
    fn combine(&self, factors: &[FactorSeries]) -> Result<Combination> {
        self.fit(factors, &self.returns).map(|f| f.combination)
    }

    fn name(&self) -> &str {
        "regression"
    }
}
