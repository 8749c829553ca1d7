//! Rolling, time-pooled IC.
//!
//! Unlike the daily IC, each point here is one correlation over every
//! `(instrument, date)` pair inside a trailing window of dates. The series of
//! window correlations shows whether predictive power drifts or reverses.

use ronda_traits::stats::{self, is_degenerate};
use ronda_traits::{
    Date, Diagnostics, EvalContext, FactorSeries, IcMethod, Result, ReturnSeries, SkipKey,
    SkipReason,
};
use serde::{Deserialize, Serialize};

use crate::metrics::AggregateStat;

/// One pooled window correlation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingIcPoint {
    /// Last date of the window.
    pub end_date: Date,
    /// Pooled correlation.
    pub ic: f64,
    /// Number of pooled pairs.
    pub sample_size: usize,
}

/// Output of [`StabilityAnalyzer::rolling_ic`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollingIc {
    /// Window length in dates.
    pub window: usize,
    /// One point per usable window, ascending by end date.
    pub points: Vec<RollingIcPoint>,
    /// Windows skipped and why.
    pub diagnostics: Diagnostics,
}

impl RollingIc {
    /// Mean, std, IR and hit rate of the window correlations.
    pub fn aggregate(&self) -> Result<AggregateStat> {
        let values: Vec<f64> = self.points.iter().map(|p| p.ic).collect();
        AggregateStat::from_values(&values)
    }
}

/// Computes pooled correlations over trailing windows of dates.
#[derive(Debug, Clone)]
pub struct StabilityAnalyzer {
    ctx: EvalContext,
}

impl StabilityAnalyzer {
    /// Create an analyzer bound to a run context.
    pub fn new(ctx: &EvalContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Rolling IC with the configured window.
    pub fn apply(&self, factor: &FactorSeries, returns: &ReturnSeries) -> RollingIc {
        self.rolling_ic(factor, returns, self.ctx.config().stability.window)
    }

    /// Pooled correlation over each run of `window` consecutive joined dates.
    ///
    /// Windows are only formed once `window` dates are available; a shorter
    /// sample is recorded as one [`SkipReason::InsufficientData`] skip keyed
    /// by its last date. A window with fewer than `stability.min_observations`
    /// pairs is skipped as
    /// [`SkipReason::InsufficientData`]; one with constant factor or return
    /// values as [`SkipReason::DegenerateDistribution`].
    pub fn rolling_ic(
        &self,
        factor: &FactorSeries,
        returns: &ReturnSeries,
        window: usize,
    ) -> RollingIc {
        let _span = self.ctx.enter("stability");
        let cfg = &self.ctx.config().stability;
        let mut diagnostics = Diagnostics::new();
        let mut points = Vec::new();

        let joined: Vec<(Date, Vec<(f64, f64)>)> = factor
            .join_by_date(returns.series())
            .into_iter()
            .map(|(date, rows)| (date, rows.into_iter().map(|r| (r.1, r.2)).collect()))
            .collect();

        if window > 0 && joined.len() >= window {
            for slice in joined.windows(window) {
                let end_date = slice[window - 1].0;
                let (x, y): (Vec<f64>, Vec<f64>) =
                    slice.iter().flat_map(|(_, pairs)| pairs.iter().copied()).unzip();

                if x.len() < cfg.min_observations.max(2) {
                    diagnostics.skip("stability", SkipKey::Date(end_date), SkipReason::InsufficientData);
                    continue;
                }
                if is_degenerate(&x) || is_degenerate(&y) {
                    diagnostics.skip(
                        "stability",
                        SkipKey::Date(end_date),
                        SkipReason::DegenerateDistribution,
                    );
                    continue;
                }
                let ic = match cfg.method {
                    IcMethod::Pearson => stats::pearson(&x, &y),
                    IcMethod::Spearman => stats::spearman(&x, &y),
                };
                if let Some(ic) = ic {
                    points.push(RollingIcPoint {
                        end_date,
                        ic,
                        sample_size: x.len(),
                    });
                }
            }
        } else if let Some((last, _)) = joined.last() {
            tracing::debug!(dates = joined.len(), window, "not enough dates for a full window");
            diagnostics.skip("stability", SkipKey::Date(*last), SkipReason::InsufficientData);
        }

        diagnostics.log_summary("stability");
        RollingIc {
            window,
            points,
            diagnostics,
        }
    }
}
