//! Quantile bucket analysis.
//!
//! Each date's joined cross-section is sorted by factor value and cut into
//! `G` equal-count buckets (bucket 1 = lowest factor values). The per-bucket
//! mean forward returns show whether the factor separates winners from losers.

use std::collections::BTreeMap;

use ronda_traits::stats::{self, MIN_STD_THRESHOLD};
use ronda_traits::{
    Date, Diagnostics, EvalContext, FactorSeries, InstrumentId, ReturnSeries, SkipKey, SkipReason,
};
use serde::{Deserialize, Serialize};

/// One bucket on one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Date of the cross-section.
    pub date: Date,
    /// 1-based bucket id, ascending in factor value.
    pub bucket_id: usize,
    /// Mean forward return of the bucket's members.
    pub mean_return: f64,
    /// Number of members.
    pub size: usize,
}

/// Statistics of one bucket across dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    /// 1-based bucket id.
    pub bucket_id: usize,
    /// Mean of the per-date mean returns.
    pub mean_return: f64,
    /// Sample std of the per-date mean returns (`None` with fewer than 2 dates).
    pub std_return: Option<f64>,
    /// mean / std per period (`None` when std is undefined or zero).
    pub sharpe: Option<f64>,
    /// Fraction of dates with a positive mean return.
    pub win_rate: f64,
    /// Number of dates.
    pub n_dates: usize,
}

/// Top-minus-bottom spread across dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongShort {
    /// Mean of per-date (bucket G - bucket 1) spreads.
    pub mean: f64,
    /// Sample std of the spreads (`None` with fewer than 2 dates).
    pub std: Option<f64>,
    /// mean / std per period (`None` when std is undefined or zero).
    pub sharpe: Option<f64>,
    /// Number of dates.
    pub n_dates: usize,
}

/// Output of [`QuantileBucketer::bucket`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketAnalysis {
    /// Number of buckets per date.
    pub num_buckets: usize,
    /// Every bucket of every usable date, ordered by date then bucket id.
    pub buckets: Vec<Bucket>,
    /// Per-bucket statistics, ordered by bucket id.
    pub summaries: Vec<BucketSummary>,
    /// Spread of the top over the bottom bucket.
    pub long_short: Option<LongShort>,
    /// Spearman correlation of bucket id against bucket mean return.
    pub monotonicity: Option<f64>,
    /// Dates skipped for having fewer observations than buckets.
    pub diagnostics: Diagnostics,
}

impl BucketAnalysis {
    /// Number of usable dates.
    pub fn n_dates(&self) -> usize {
        self.buckets.len() / self.num_buckets.max(1)
    }

    /// Buckets of one date.
    pub fn on(&self, date: Date) -> Vec<Bucket> {
        self.buckets.iter().filter(|b| b.date == date).copied().collect()
    }
}

/// Partitions cross-sections into equal-count quantile buckets.
#[derive(Debug, Clone)]
pub struct QuantileBucketer {
    ctx: EvalContext,
}

impl QuantileBucketer {
    /// Create a bucketer bound to a run context.
    pub fn new(ctx: &EvalContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Bucket with the configured number of buckets.
    pub fn apply(&self, factor: &FactorSeries, returns: &ReturnSeries) -> BucketAnalysis {
        self.bucket(factor, returns, self.ctx.config().num_buckets)
    }

    /// Bucket every date present in both series.
    ///
    /// With `N` joined observations and `G` buckets, the first `N % G`
    /// buckets hold one extra member, so sizes differ by at most 1. Equal
    /// factor values are ordered by instrument id. Dates with `N < G` are
    /// skipped as [`SkipReason::InsufficientCrossSection`].
    pub fn bucket(
        &self,
        factor: &FactorSeries,
        returns: &ReturnSeries,
        num_buckets: usize,
    ) -> BucketAnalysis {
        let _span = self.ctx.enter("quantile");
        let mut diagnostics = Diagnostics::new();
        let mut buckets = Vec::new();

        if num_buckets == 0 {
            return BucketAnalysis {
                num_buckets,
                ..Default::default()
            };
        }

        for (date, mut rows) in factor.join_by_date(returns.series()) {
            if rows.len() < num_buckets {
                diagnostics.skip(
                    "quantile",
                    SkipKey::Date(date),
                    SkipReason::InsufficientCrossSection,
                );
                continue;
            }
            rows.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            buckets.extend(bucket_date(date, &rows, num_buckets));
        }

        diagnostics.log_summary("quantile");

        let summaries = summarize(&buckets, num_buckets);
        let long_short = long_short(&buckets, num_buckets);
        let monotonicity = monotonicity(&summaries);
        tracing::debug!(
            factor = factor.name(),
            dates = buckets.len() / num_buckets,
            spread = long_short.as_ref().map(|ls| ls.mean),
            "quantile buckets computed"
        );

        BucketAnalysis {
            num_buckets,
            buckets,
            summaries,
            long_short,
            monotonicity,
            diagnostics,
        }
    }
}

/// Bucket sizes for `n` observations in `g` buckets, lowest bucket first.
pub fn bucket_sizes(n: usize, g: usize) -> Vec<usize> {
    if g == 0 {
        return Vec::new();
    }
    let base = n / g;
    let extra = n % g;
    (0..g).map(|k| base + usize::from(k < extra)).collect()
}

fn bucket_date(date: Date, sorted: &[(InstrumentId, f64, f64)], g: usize) -> Vec<Bucket> {
    let mut out = Vec::with_capacity(g);
    let mut start = 0;
    for (k, size) in bucket_sizes(sorted.len(), g).into_iter().enumerate() {
        let members = &sorted[start..start + size];
        let returns: Vec<f64> = members.iter().map(|r| r.2).collect();
        out.push(Bucket {
            date,
            bucket_id: k + 1,
            mean_return: stats::mean(&returns).unwrap_or(f64::NAN),
            size,
        });
        start += size;
    }
    out
}

fn ratio(mean: f64, std: Option<f64>) -> Option<f64> {
    std.filter(|s| *s > MIN_STD_THRESHOLD).map(|s| mean / s)
}

fn summarize(buckets: &[Bucket], g: usize) -> Vec<BucketSummary> {
    let mut by_id: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for b in buckets {
        by_id.entry(b.bucket_id).or_default().push(b.mean_return);
    }
    (1..=g)
        .filter_map(|id| {
            let values = by_id.get(&id)?;
            let mean_return = stats::mean(values)?;
            let std_return = stats::sample_std(values);
            Some(BucketSummary {
                bucket_id: id,
                mean_return,
                std_return,
                sharpe: ratio(mean_return, std_return),
                win_rate: values.iter().filter(|&&r| r > 0.0).count() as f64 / values.len() as f64,
                n_dates: values.len(),
            })
        })
        .collect()
}

fn long_short(buckets: &[Bucket], g: usize) -> Option<LongShort> {
    let mut low: BTreeMap<Date, f64> = BTreeMap::new();
    let mut high: BTreeMap<Date, f64> = BTreeMap::new();
    for b in buckets {
        if b.bucket_id == 1 {
            low.insert(b.date, b.mean_return);
        }
        if b.bucket_id == g {
            high.insert(b.date, b.mean_return);
        }
    }
    let spreads: Vec<f64> = high
        .iter()
        .filter_map(|(date, h)| low.get(date).map(|l| h - l))
        .collect();
    let mean = stats::mean(&spreads)?;
    let std = stats::sample_std(&spreads);
    Some(LongShort {
        mean,
        std,
        sharpe: ratio(mean, std),
        n_dates: spreads.len(),
    })
}

fn monotonicity(summaries: &[BucketSummary]) -> Option<f64> {
    let ids: Vec<f64> = summaries.iter().map(|s| s.bucket_id as f64).collect();
    let means: Vec<f64> = summaries.iter().map(|s| s.mean_return).collect();
    stats::spearman(&ids, &means)
}
