//! Equal-weighted rank-sum combination strategy.

use std::collections::BTreeSet;

use ronda_traits::{
    Axis, Date, Diagnostics, EvalContext, FactorSeries, NormalizeMethod, Normalizer, Result,
    SkipKey,
};

use crate::combiner::{Combination, Combiner, combine_weighted};
use crate::weights::WeightVector;

/// Equal-weighted combiner over per-date percentile ranks.
///
/// Each factor is ranked across instruments on every date independently of
/// the others, then the ranks are averaged with weight `1 / k`. Ranking
/// makes the inputs scale-free, so no factor dominates by magnitude.
///
/// # Examples
///
/// ```rust,no_run
/// use ronda_combine::{Combiner, RankSumCombiner};
/// use ronda_traits::EvalContext;
///
/// # fn run(momentum: ronda_traits::FactorSeries, value: ronda_traits::FactorSeries) -> ronda_traits::Result<()> {
/// let combiner = RankSumCombiner::new(&EvalContext::default());
/// let combination = combiner.combine(&[momentum, value])?;
/// assert!(combination.weights.is_convex());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RankSumCombiner {
    ctx: EvalContext,
}

impl RankSumCombiner {
    /// Create a rank-sum combiner bound to a run context.
    pub fn new(ctx: &EvalContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Per-date percentile ranks of `factor`.
    ///
    /// A date with a single observation ranks it at 1.0, the top of (0, 1].
    pub fn rank(&self, factor: &FactorSeries) -> FactorSeries {
        let normalized =
            Normalizer::new(&self.ctx).normalize(factor, Axis::CrossSection, NormalizeMethod::Rank);
        let singletons: BTreeSet<Date> = normalized
            .diagnostics
            .skips()
            .iter()
            .filter_map(|s| match s.key {
                SkipKey::Date(date) => Some(date),
                SkipKey::Instrument(_) => None,
            })
            .collect();
        let mut ranked = normalized.series;
        for (instrument, date) in factor.keys() {
            if singletons.contains(&date) {
                ranked.insert(instrument, date, 1.0);
            }
        }
        ranked
    }
}

impl Combiner for RankSumCombiner {
    fn combine(&self, factors: &[FactorSeries]) -> Result<Combination> {
        let _span = self.ctx.enter("rank_sum");
        let ranked: Vec<FactorSeries> = factors.iter().map(|f| self.rank(f)).collect();

        let names: Vec<&str> = factors.iter().map(|f| f.name()).collect();
        let weights = WeightVector::equal(&names)?;
        let composite = combine_weighted(&ranked, &weights, self.name())?;

        tracing::debug!(factors = factors.len(), keys = composite.len(), "rank-sum composite built");
        Ok(Combination {
            composite,
            weights,
            diagnostics: Diagnostics::new(),
        })
    }

    fn name(&self) -> &str {
        "rank_sum"
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ronda_traits::{InstrumentId, Observation, RondaError};

    use super::*;

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 2, day).unwrap()
    }

    fn series(name: &str, rows: &[(&str, u32, f64)]) -> FactorSeries {
        FactorSeries::from_observations(
            name,
            rows.iter().map(|(i, day, v)| Observation::new(*i, d(*day), *v)),
        )
        .unwrap()
    }

    #[test]
    fn test_mean_of_ranks() {
        let a = series("a", &[("X", 1, 10.0), ("Y", 1, 20.0), ("Z", 1, 30.0), ("W", 1, 40.0)]);
        let b = series("b", &[("X", 1, 0.3), ("Y", 1, 0.1), ("Z", 1, 0.2), ("W", 1, 0.4)]);
        let combination = RankSumCombiner::new(&EvalContext::default()).combine(&[a, b]).unwrap();

        assert!(combination.weights.is_convex());
        assert_eq!(combination.composite.len(), 4);
        // a ranks X..W as 1..4, b ranks them 3,1,2,4; percentiles divide by 4
        let get = |i: &str| combination.composite.get(&InstrumentId::from(i), d(1)).unwrap();
        assert_abs_diff_eq!(get("X"), (0.25 + 0.75) / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(get("Y"), (0.50 + 0.25) / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(get("W"), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scale_invariance() {
        let a = series("a", &[("X", 1, 1.0), ("Y", 1, 2.0), ("Z", 1, 3.0)]);
        let a_big = series("a", &[("X", 1, 1000.0), ("Y", 1, 2000.0), ("Z", 1, 3000.0)]);
        let b = series("b", &[("X", 1, 3.0), ("Y", 1, 1.0), ("Z", 1, 2.0)]);
        let combiner = RankSumCombiner::new(&EvalContext::default());
        let small = combiner.combine(&[a, b.clone()]).unwrap();
        let big = combiner.combine(&[a_big, b]).unwrap();
        assert_eq!(small.composite.values(), big.composite.values());
    }

    #[test]
    fn test_singleton_date_ranked_at_top() {
        let a = series("a", &[("X", 1, 1.0), ("Y", 1, 2.0), ("X", 2, 5.0)]);
        let b = series("b", &[("X", 1, 2.0), ("Y", 1, 1.0), ("X", 2, -3.0)]);
        let common = FactorSeries::intersect_keys(&[&a, &b]);
        let combination = RankSumCombiner::new(&EvalContext::default()).combine(&[a, b]).unwrap();

        assert_eq!(combination.composite.keys(), common);
        assert_eq!(combination.composite.dates(), vec![d(1), d(2)]);
        assert_abs_diff_eq!(combination.composite.get(&InstrumentId::from("X"), d(2)).unwrap(), 1.0);
        assert!(combination.diagnostics.is_empty());
    }

    #[test]
    fn test_no_common_keys() {
        let a = series("a", &[("X", 1, 1.0), ("Y", 1, 2.0)]);
        let b = series("b", &[("Z", 1, 1.0), ("W", 1, 2.0)]);
        let err = RankSumCombiner::new(&EvalContext::default()).combine(&[a, b]).unwrap_err();
        assert!(matches!(err, RondaError::KeyMismatch(_)));
    }
}
