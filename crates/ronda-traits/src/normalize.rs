//! Factor normalization along the time or cross-sectional axis.

use std::collections::BTreeMap;

use crate::config::{Axis, NormalizeMethod};
use crate::context::EvalContext;
use crate::diagnostics::{Diagnostics, SkipKey, SkipReason};
use crate::series::{FactorSeries, Key};
use crate::stats::{self, MAD_SCALE};

/// Output of [`Normalizer::normalize`].
#[derive(Debug, Clone)]
pub struct Normalized {
    /// The rescaled series, same name and keys as the input.
    pub series: FactorSeries,
    /// Groups left unmodified for lack of observations.
    pub diagnostics: Diagnostics,
}

/// Rescales a factor series group by group.
///
/// Groups are instruments for [`Axis::Time`] and dates for
/// [`Axis::CrossSection`]. A group with zero standard deviation passes
/// through unchanged; a group with fewer than 2 observations is returned
/// as-is and recorded as [`SkipReason::InsufficientData`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    ctx: EvalContext,
}

impl Normalizer {
    /// Create a normalizer bound to a run context.
    pub fn new(ctx: &EvalContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Normalize with the axis and method from the run configuration.
    pub fn apply(&self, series: &FactorSeries) -> Normalized {
        let cfg = &self.ctx.config().normalization;
        self.normalize(series, cfg.axis, cfg.method)
    }

    /// Normalize `series` along `axis` with `method`. The input is not modified.
    pub fn normalize(
        &self,
        series: &FactorSeries,
        axis: Axis,
        method: NormalizeMethod,
    ) -> Normalized {
        let _span = self.ctx.enter("normalize");
        let mut diagnostics = Diagnostics::new();

        let groups = group(series, axis);
        let mut out = BTreeMap::new();
        for (group_key, members) in groups {
            let values: Vec<f64> = members.iter().map(|(_, v)| *v).collect();
            let transformed = if values.len() < 2 {
                diagnostics.skip("normalize", group_key, SkipReason::InsufficientData);
                values
            } else {
                self.transform(&values, method)
            };
            for ((key, _), v) in members.into_iter().zip(transformed) {
                out.insert(key, v);
            }
        }

        diagnostics.log_summary("normalize");
        tracing::debug!(factor = series.name(), ?axis, ?method, n = out.len(), "normalized");

        Normalized {
            series: FactorSeries::from_map(series.name(), out),
            diagnostics,
        }
    }

    fn transform(&self, values: &[f64], method: NormalizeMethod) -> Vec<f64> {
        let cfg = &self.ctx.config().normalization;
        match method {
            NormalizeMethod::Standardize => stats::standardize(values).0,
            NormalizeMethod::Winsorize => {
                let (lo, hi) = cfg.winsorize_limits;
                stats::standardize(&winsorize(values, lo, hi)).0
            }
            NormalizeMethod::Rank => stats::percentile_ranks(values),
            NormalizeMethod::Robust => {
                stats::standardize(&mad_clip(values, cfg.mad_multiplier)).0
            }
        }
    }
}

fn group(series: &FactorSeries, axis: Axis) -> BTreeMap<SkipKey, Vec<(Key, f64)>> {
    let mut groups: BTreeMap<SkipKey, Vec<(Key, f64)>> = BTreeMap::new();
    for (key, v) in series.iter() {
        let group_key = match axis {
            Axis::Time => SkipKey::Instrument(key.0.clone()),
            Axis::CrossSection => SkipKey::Date(key.1),
        };
        groups.entry(group_key).or_default().push((key.clone(), v));
    }
    groups
}

/// Clip values to the `lower` and `upper` empirical quantiles.
pub fn winsorize(values: &[f64], lower: f64, upper: f64) -> Vec<f64> {
    let (Some(lo), Some(hi)) = (stats::quantile(values, lower), stats::quantile(values, upper))
    else {
        return values.to_vec();
    };
    values.iter().map(|v| v.clamp(lo, hi)).collect()
}

/// Clip values to `median +/- k * 1.4826 * MAD`. A zero MAD leaves values unchanged.
pub fn mad_clip(values: &[f64], k: f64) -> Vec<f64> {
    let (Some(m), Some(mad)) = (stats::median(values), stats::mad(values)) else {
        return values.to_vec();
    };
    let width = k * MAD_SCALE * mad;
    if width <= 0.0 {
        return values.to_vec();
    }
    values.iter().map(|v| v.clamp(m - width, m + width)).collect()
}
