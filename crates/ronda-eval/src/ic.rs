//! Information Coefficient (IC) calculations.
//!
//! The daily IC is the cross-sectional correlation between factor values and
//! forward returns on one date. Both the Pearson and the Spearman (rank)
//! versions are kept for every date that survives filtering.

use ronda_traits::stats::{self, is_degenerate};
use ronda_traits::{
    Date, Diagnostics, EvalContext, FactorSeries, IcMethod, Result, ReturnSeries, SkipKey,
    SkipReason,
};
use serde::{Deserialize, Serialize};

use crate::metrics::AggregateStat;

/// Correlations of one date's joined cross-section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyStat {
    /// Date of the cross-section.
    pub date: Date,
    /// Pearson correlation of raw values.
    pub pearson_ic: f64,
    /// Spearman correlation (Pearson on average ranks).
    pub spearman_ic: f64,
    /// Number of joined instruments.
    pub sample_size: usize,
}

impl DailyStat {
    /// The IC selected by `method`.
    pub const fn ic(&self, method: IcMethod) -> f64 {
        match method {
            IcMethod::Pearson => self.pearson_ic,
            IcMethod::Spearman => self.spearman_ic,
        }
    }
}

/// Output of [`IcEngine::compute_daily_ic`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyIc {
    /// One entry per usable date, ascending.
    pub stats: Vec<DailyStat>,
    /// Dates excluded and why.
    pub diagnostics: Diagnostics,
}

/// Computes daily cross-sectional ICs and aggregates them.
#[derive(Debug, Clone)]
pub struct IcEngine {
    ctx: EvalContext,
}

impl IcEngine {
    /// Create an engine bound to a run context.
    pub fn new(ctx: &EvalContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Daily IC for every date present in both series.
    ///
    /// A date is skipped, never zero-filled, when
    /// - the joined sample is smaller than `min_cross_section`
    ///   ([`SkipReason::InsufficientData`]), or
    /// - factor or return values are constant on that date
    ///   ([`SkipReason::DegenerateDistribution`]).
    pub fn compute_daily_ic(&self, factor: &FactorSeries, returns: &ReturnSeries) -> DailyIc {
        let _span = self.ctx.enter("ic");
        let min_n = self.ctx.config().min_cross_section;
        let mut diagnostics = Diagnostics::new();
        let mut out = Vec::new();

        for (date, rows) in factor.join_by_date(returns.series()) {
            let n = rows.len();
            if n < min_n {
                diagnostics.skip("ic", SkipKey::Date(date), SkipReason::InsufficientData);
                continue;
            }
            let x: Vec<f64> = rows.iter().map(|r| r.1).collect();
            let y: Vec<f64> = rows.iter().map(|r| r.2).collect();
            if is_degenerate(&x) || is_degenerate(&y) {
                diagnostics.skip("ic", SkipKey::Date(date), SkipReason::DegenerateDistribution);
                continue;
            }
            let (Some(pearson_ic), Some(spearman_ic)) = (stats::pearson(&x, &y), stats::spearman(&x, &y))
            else {
                diagnostics.skip("ic", SkipKey::Date(date), SkipReason::DegenerateDistribution);
                continue;
            };
            out.push(DailyStat {
                date,
                pearson_ic,
                spearman_ic,
                sample_size: n,
            });
        }

        diagnostics.log_summary("ic");
        tracing::debug!(factor = factor.name(), dates = out.len(), "daily IC computed");
        DailyIc {
            stats: out,
            diagnostics,
        }
    }

    /// Aggregate daily stats using the IC selected by `method`.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::NoUsableData`](ronda_traits::RondaError::NoUsableData)
    /// when `stats` is empty.
    pub fn aggregate(&self, stats: &[DailyStat], method: IcMethod) -> Result<AggregateStat> {
        let values: Vec<f64> = stats.iter().map(|s| s.ic(method)).collect();
        AggregateStat::from_values(&values)
    }
}

/// Spearman IC of two aligned slices, ignoring pairs with a non-finite side.
///
/// Returns `None` when fewer than 2 pairs remain or either side is constant.
///
/// # Example
///
/// ```
/// use ronda_eval::calculate_ic;
///
/// let ic = calculate_ic(&[1.5, 0.3, -0.8, 2.1], &[0.02, 0.01, -0.01, 0.03]).unwrap();
/// assert!((ic - 1.0).abs() < 1e-12);
/// ```
pub fn calculate_ic(signal_scores: &[f64], forward_returns: &[f64]) -> Option<f64> {
    if signal_scores.len() != forward_returns.len() {
        return None;
    }
    let (x, y): (Vec<f64>, Vec<f64>) = signal_scores
        .iter()
        .zip(forward_returns)
        .filter(|(s, r)| s.is_finite() && r.is_finite())
        .map(|(s, r)| (*s, *r))
        .unzip();
    stats::spearman(&x, &y)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ronda_traits::{EvalConfig, Observation, ReturnAnchor};

    use super::*;

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn ctx(min_cross_section: usize) -> EvalContext {
        EvalContext::with_run_id(
            EvalConfig {
                min_cross_section,
                ..Default::default()
            },
            "test",
        )
        .unwrap()
    }

    fn series(name: &str, rows: &[(&str, u32, f64)]) -> FactorSeries {
        FactorSeries::from_observations(
            name,
            rows.iter().map(|(i, day, v)| Observation::new(*i, d(*day), *v)),
        )
        .unwrap()
    }

    fn returns(rows: &[(&str, u32, f64)]) -> ReturnSeries {
        ReturnSeries::new(series("ret", rows), 1, ReturnAnchor::CloseToClose)
    }

    #[test]
    fn test_calculate_ic_perfect_correlation() {
        let ic = calculate_ic(&[1.0, 2.0, 3.0, 4.0, 5.0], &[0.01, 0.02, 0.03, 0.04, 0.05]).unwrap();
        assert_abs_diff_eq!(ic, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_calculate_ic_negative_correlation() {
        let ic = calculate_ic(&[5.0, 4.0, 3.0, 2.0, 1.0], &[0.01, 0.02, 0.03, 0.04, 0.05]).unwrap();
        assert_abs_diff_eq!(ic, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_calculate_ic_with_nans() {
        let ic = calculate_ic(&[1.0, 2.0, f64::NAN, 4.0], &[0.01, 0.02, 0.03, 0.04]);
        assert!(ic.is_some_and(f64::is_finite));
    }

    #[test]
    fn test_concordant_ranks_both_dates() {
        let factor = series(
            "f",
            &[("A", 1, 1.0), ("B", 1, 2.0), ("C", 1, 3.0), ("A", 2, 2.0), ("B", 2, 1.0), ("C", 2, 3.0)],
        );
        let ret = returns(&[
            ("A", 1, 0.01),
            ("B", 1, 0.02),
            ("C", 1, 0.03),
            ("A", 2, 0.02),
            ("B", 2, 0.01),
            ("C", 2, 0.03),
        ]);
        let engine = IcEngine::new(&ctx(3));
        let daily = engine.compute_daily_ic(&factor, &ret);
        assert_eq!(daily.stats.len(), 2);
        for stat in &daily.stats {
            assert_abs_diff_eq!(stat.spearman_ic, 1.0, epsilon = 1e-12);
            assert_eq!(stat.sample_size, 3);
        }

        let agg = engine.aggregate(&daily.stats, IcMethod::Spearman).unwrap();
        assert_abs_diff_eq!(agg.mean_ic, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(agg.std_ic, 0.0, epsilon = 1e-12);
        assert!(agg.information_ratio.is_none());
    }

    #[test]
    fn test_constant_factor_date_skipped() {
        let factor = series(
            "f",
            &[("A", 1, 1.0), ("B", 1, 1.0), ("C", 1, 1.0), ("A", 2, 1.0), ("B", 2, 2.0), ("C", 2, 3.0)],
        );
        let ret = returns(&[
            ("A", 1, 0.01),
            ("B", 1, 0.02),
            ("C", 1, 0.03),
            ("A", 2, 0.01),
            ("B", 2, 0.03),
            ("C", 2, 0.02),
        ]);
        let daily = IcEngine::new(&ctx(3)).compute_daily_ic(&factor, &ret);
        assert_eq!(daily.stats.len(), 1);
        assert_eq!(daily.stats[0].date, d(2));
        assert_eq!(daily.diagnostics.count(SkipReason::DegenerateDistribution), 1);
    }

    #[test]
    fn test_small_cross_section_skipped() {
        let factor = series("f", &[("A", 1, 1.0), ("B", 1, 2.0)]);
        let ret = returns(&[("A", 1, 0.01), ("B", 1, 0.02)]);
        let daily = IcEngine::new(&ctx(3)).compute_daily_ic(&factor, &ret);
        assert!(daily.stats.is_empty());
        assert_eq!(daily.diagnostics.count(SkipReason::InsufficientData), 1);
    }

    #[test]
    fn test_aggregate_empty_is_error() {
        let engine = IcEngine::new(&ctx(3));
        assert!(engine.aggregate(&[], IcMethod::Pearson).is_err());
    }
}
