//! Single-factor evaluation.
//!
//! Runs the full per-factor pipeline: range restriction, cutoff check,
//! normalization, daily IC, quantile buckets and rolling IC. The resulting
//! [`EvaluationReport`] is plain data for a rendering layer to consume.

use std::collections::BTreeMap;

use ronda_traits::{
    Diagnostics, EvalConfig, EvalContext, FactorSeries, Normalizer, Result, ReturnSeries,
    RondaError, SkipReason,
};
use serde::{Deserialize, Serialize};

use crate::ic::{DailyStat, IcEngine};
use crate::metrics::AggregateStat;
use crate::quantile::{BucketAnalysis, QuantileBucketer};
use crate::stability::{RollingIc, StabilityAnalyzer};

/// Everything computed for one factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Factor name.
    pub factor: String,
    /// Run that produced the report.
    pub run_id: String,
    /// Configuration the report was computed with.
    pub config: EvalConfig,
    /// Daily ICs, ascending by date.
    pub daily: Vec<DailyStat>,
    /// Aggregate of the configured daily IC.
    pub aggregate: AggregateStat,
    /// Quantile bucket analysis.
    pub buckets: BucketAnalysis,
    /// Rolling pooled IC.
    pub rolling: RollingIc,
    /// Aggregate of the rolling IC, absent when no window was usable.
    pub rolling_aggregate: Option<AggregateStat>,
    /// Every skip from every stage.
    pub diagnostics: Diagnostics,
    /// Skip counts per reason.
    pub skip_counts: BTreeMap<SkipReason, usize>,
}

impl EvaluationReport {
    /// Annualized IR of the daily IC, when defined.
    pub fn annualized_ir(&self) -> Option<f64> {
        self.aggregate.annualized_ir(self.config.trading_days_per_year)
    }
}

/// Evaluates one factor against forward returns.
///
/// # Example
///
/// ```rust,ignore
/// use ronda_eval::FactorEvaluator;
/// use ronda_traits::{EvalConfig, EvalContext};
///
/// let ctx = EvalContext::new(EvalConfig::default())?;
/// let report = FactorEvaluator::new(&ctx).evaluate(&factor, &returns)?;
/// println!("IC {:.4} over {} dates", report.aggregate.mean_ic, report.aggregate.n_dates);
/// ```
#[derive(Debug, Clone)]
pub struct FactorEvaluator {
    ctx: EvalContext,
}

impl FactorEvaluator {
    /// Create an evaluator bound to a run context.
    pub fn new(ctx: &EvalContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Evaluate `factor` against `returns`.
    ///
    /// # Errors
    ///
    /// - [`RondaError::LookAhead`] when a return inside the range is dated
    ///   after the effective cutoff.
    /// - [`RondaError::NoUsableData`] when no date yields a daily IC.
    pub fn evaluate(&self, factor: &FactorSeries, returns: &ReturnSeries) -> Result<EvaluationReport> {
        let _span = self.ctx.enter("evaluate");
        let cfg = self.ctx.config();

        let factor = factor.restrict_range(cfg.start, cfg.end);
        let returns = returns.restrict_range(cfg.start, cfg.end);
        if let Some(cutoff) = cfg.effective_cutoff() {
            returns.ensure_not_after(cutoff)?;
        }

        let normalized = Normalizer::new(&self.ctx).apply(&factor);
        let factor = normalized.series;
        let mut diagnostics = normalized.diagnostics;

        let engine = IcEngine::new(&self.ctx);
        let daily = engine.compute_daily_ic(&factor, &returns);
        diagnostics.merge(daily.diagnostics);
        if daily.stats.is_empty() {
            diagnostics.log_summary("evaluate");
            return Err(RondaError::NoUsableData(format!(
                "no date of {} survived filtering ({} skipped)",
                factor.name(),
                diagnostics.count_stage("ic")
            )));
        }
        let aggregate = engine.aggregate(&daily.stats, cfg.ic_method)?;

        let mut buckets = QuantileBucketer::new(&self.ctx).apply(&factor, &returns);
        diagnostics.merge(std::mem::take(&mut buckets.diagnostics));

        let mut rolling = StabilityAnalyzer::new(&self.ctx).apply(&factor, &returns);
        diagnostics.merge(std::mem::take(&mut rolling.diagnostics));
        let rolling_aggregate = rolling.aggregate().ok();

        tracing::info!(
            factor = factor.name(),
            mean_ic = aggregate.mean_ic,
            ir = ?aggregate.information_ratio,
            dates = aggregate.n_dates,
            skipped = diagnostics.len(),
            "factor evaluated"
        );

        Ok(EvaluationReport {
            factor: factor.name().to_string(),
            run_id: self.ctx.run_id().to_string(),
            config: cfg.clone(),
            daily: daily.stats,
            aggregate,
            buckets,
            rolling,
            rolling_aggregate,
            skip_counts: diagnostics.counts(),
            diagnostics,
        })
    }
}
