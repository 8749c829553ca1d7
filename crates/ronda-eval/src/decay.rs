//! Factor decay analysis.
//!
//! Analyzes how a factor's mean IC changes as the forward-return horizon
//! grows. Useful for choosing the holding period and rebalancing frequency.

use ronda_traits::{EvalContext, FactorSeries, PriceHistory, ReturnSeries};
use serde::{Deserialize, Serialize};

use crate::ic::IcEngine;

/// Decay curve data points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayCurve {
    /// Time horizons (in periods)
    pub horizons: Vec<usize>,
    /// Mean IC at each horizon (NaN where no date survived)
    pub ic_values: Vec<f64>,
    /// Standard errors of IC at each horizon
    pub ic_std_errors: Vec<f64>,
}

impl DecayCurve {
    /// Create a new decay curve.
    pub const fn new(horizons: Vec<usize>, ic_values: Vec<f64>, ic_std_errors: Vec<f64>) -> Self {
        Self {
            horizons,
            ic_values,
            ic_std_errors,
        }
    }

    /// Get IC at a specific horizon (interpolated if needed).
    pub fn ic_at_horizon(&self, horizon: usize) -> Option<f64> {
        if let Some(pos) = self.horizons.iter().position(|&h| h == horizon) {
            return Some(self.ic_values[pos]);
        }

        for (h, ic) in self.horizons.windows(2).zip(self.ic_values.windows(2)) {
            if h[0] < horizon && horizon < h[1] {
                let weight = (horizon - h[0]) as f64 / (h[1] - h[0]) as f64;
                return Some(ic[0] + weight * (ic[1] - ic[0]));
            }
        }

        None
    }

    /// Estimate half-life: horizon at which |IC| drops to 50% of its initial value.
    pub fn half_life(&self) -> Option<f64> {
        let initial_ic = self.ic_values.first()?.abs();
        if !initial_ic.is_finite() || initial_ic == 0.0 {
            return None;
        }
        let half_ic = initial_ic / 2.0;

        for (h, ic) in self.horizons.windows(2).zip(self.ic_values.windows(2)) {
            let ic1 = ic[0].abs();
            let ic2 = ic[1].abs();

            if ic1 >= half_ic && ic2 <= half_ic && ic1 > ic2 {
                let weight = (ic1 - half_ic) / (ic1 - ic2);
                return Some(h[0] as f64 + weight * (h[1] - h[0]) as f64);
            }
        }

        None
    }
}

/// Factor decay analysis across multiple horizons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayAnalysis {
    /// Decay curve data
    pub curve: DecayCurve,
    /// Estimated half-life in periods
    pub half_life: Option<f64>,
    /// Horizon with the largest |IC| and that IC
    pub max_ic: Option<(usize, f64)>,
    /// Whether |IC| never increases with the horizon
    pub is_monotonic: bool,
}

impl DecayAnalysis {
    /// Analyze decay given a per-horizon IC calculator.
    ///
    /// # Arguments
    ///
    /// * `horizons` - Horizons to analyze, ascending
    /// * `ic_calculator` - Returns `(mean IC, standard error)` for a horizon
    ///
    /// # Example
    ///
    /// ```
    /// use ronda_eval::DecayAnalysis;
    ///
    /// let analysis = DecayAnalysis::analyze(&[1, 5, 10], |h| (0.1 / h as f64, 0.01));
    /// assert_eq!(analysis.max_ic.map(|m| m.0), Some(1));
    /// assert!(analysis.is_monotonic);
    /// ```
    pub fn analyze<F>(horizons: &[usize], mut ic_calculator: F) -> Self
    where
        F: FnMut(usize) -> (f64, f64),
    {
        let (ic_values, ic_std_errors): (Vec<f64>, Vec<f64>) =
            horizons.iter().map(|&h| ic_calculator(h)).unzip();

        let max_ic = ic_values
            .iter()
            .zip(horizons)
            .filter(|(ic, _)| ic.is_finite())
            .max_by(|(a, _), (b, _)| a.abs().total_cmp(&b.abs()))
            .map(|(&ic, &h)| (h, ic));

        let finite: Vec<f64> = ic_values.iter().copied().filter(|v| v.is_finite()).collect();
        let is_monotonic = finite.windows(2).all(|w| w[0].abs() >= w[1].abs());

        let curve = DecayCurve::new(horizons.to_vec(), ic_values, ic_std_errors);
        let half_life = curve.half_life();

        Self {
            curve,
            half_life,
            max_ic,
            is_monotonic,
        }
    }

    /// Decay of `factor` against forward returns computed from `histories`.
    ///
    /// Each horizon builds its own [`ReturnSeries`] with the configured
    /// anchor and aggregates the configured daily IC. A horizon where
    /// nothing survives is reported as NaN.
    pub fn from_prices(
        ctx: &EvalContext,
        factor: &FactorSeries,
        histories: &[PriceHistory],
        horizons: &[usize],
    ) -> Self {
        let _span = ctx.enter("decay");
        let engine = IcEngine::new(ctx);
        let method = ctx.config().ic_method;
        Self::analyze(horizons, |h| {
            let Ok(returns) = ReturnSeries::from_prices(histories, h, ctx.config().anchor) else {
                return (f64::NAN, f64::NAN);
            };
            let daily = engine.compute_daily_ic(factor, &returns);
            match engine.aggregate(&daily.stats, method) {
                Ok(agg) => (agg.mean_ic, agg.std_error()),
                Err(err) => {
                    tracing::debug!(horizon = h, %err, "no IC at horizon");
                    (f64::NAN, f64::NAN)
                }
            }
        })
    }

    /// Standard horizons for decay analysis (1, 5, 10, 21, 42, 63 days).
    pub fn standard_horizons() -> Vec<usize> {
        vec![1, 5, 10, 21, 42, 63]
    }

    /// Short-term horizons (1, 2, 3, 5, 10 days).
    pub fn short_term_horizons() -> Vec<usize> {
        vec![1, 2, 3, 5, 10]
    }
}
