//! Cross-crate behavior of the evaluation and combination pipeline.

use std::collections::BTreeMap;

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ronda::combine::{RankSumCombiner, RegressionCombiner};
use ronda::eval::{IcEngine, QuantileBucketer, bucket_sizes};
use ronda::prelude::*;
use ronda::traits::SkipReason;
use ronda::traits::stats::percentile_ranks;
use rstest::rstest;

fn day(n: u64) -> Date {
    Date::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(n)
}

fn ctx(config: EvalConfig) -> EvalContext {
    EvalContext::with_run_id(config, "properties").unwrap()
}

fn series(name: &str, rows: &[(&str, u64, f64)]) -> FactorSeries {
    FactorSeries::from_observations(
        name,
        rows.iter().map(|&(inst, d, v)| Observation::new(inst, day(d), v)),
    )
    .unwrap()
}

fn returns_of(series: FactorSeries) -> ReturnSeries {
    ReturnSeries::new(series, 1, ReturnAnchor::CloseToClose)
}

/// Seeded random-walk universe.
fn universe(instruments: usize, bars: usize, seed: u64) -> Vec<PriceHistory> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..instruments)
        .map(|i| {
            let mut close = 100.0;
            let bars = (0..bars)
                .map(|t| {
                    close *= 1.0 + rng.gen_range(-0.03..0.03);
                    PriceBar {
                        date: day(t as u64),
                        open: close * 0.998,
                        high: close * 1.01,
                        low: close * 0.99,
                        close,
                        volume: rng.gen_range(1e4..1e6),
                    }
                })
                .collect();
            PriceHistory::new(format!("I{i:03}"), bars)
        })
        .collect()
}

#[test]
fn three_instruments_two_dates() {
    let ctx = ctx(EvalConfig {
        min_cross_section: 3,
        ..Default::default()
    });
    let factor = series(
        "f",
        &[("A", 0, 1.0), ("B", 0, 2.0), ("C", 0, 3.0), ("A", 1, 2.0), ("B", 1, 1.0), ("C", 1, 3.0)],
    );
    let returns = returns_of(series(
        "r",
        &[
            ("A", 0, 0.01),
            ("B", 0, 0.02),
            ("C", 0, 0.03),
            ("A", 1, 0.02),
            ("B", 1, 0.01),
            ("C", 1, 0.03),
        ],
    ));

    let engine = IcEngine::new(&ctx);
    let daily = engine.compute_daily_ic(&factor, &returns);
    assert!(daily.diagnostics.is_empty());
    assert_eq!(daily.stats.len(), 2);
    for stat in &daily.stats {
        assert_abs_diff_eq!(stat.spearman_ic, 1.0, epsilon = 1e-12);
        assert_eq!(stat.sample_size, 3);
    }

    let agg = engine.aggregate(&daily.stats, IcMethod::Spearman).unwrap();
    assert_abs_diff_eq!(agg.mean_ic, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(agg.std_ic, 0.0, epsilon = 1e-12);
    assert_eq!(agg.information_ratio, None);
    assert_eq!(agg.n_dates, 2);
}

#[test]
fn constant_cross_section_is_skipped_not_zeroed() {
    let ctx = ctx(EvalConfig::default());
    let mut factor = Vec::new();
    let mut returns = Vec::new();
    for d in 0..3u64 {
        for i in 0..50u32 {
            let inst = format!("S{i:02}");
            let value = if d == 1 { 7.0 } else { f64::from(i) };
            factor.push(Observation::new(inst.as_str(), day(d), value));
            returns.push(Observation::new(inst.as_str(), day(d), f64::from(i % 7) * 0.001));
        }
    }
    let factor = FactorSeries::from_observations("flat_on_day_1", factor).unwrap();
    let returns = returns_of(FactorSeries::from_observations("fwd_ret_1", returns).unwrap());

    let daily = IcEngine::new(&ctx).compute_daily_ic(&factor, &returns);
    assert_eq!(daily.stats.len(), 2);
    assert!(daily.stats.iter().all(|s| s.date != day(1)));
    assert_eq!(daily.diagnostics.count(SkipReason::DegenerateDistribution), 1);

    let report = FactorEvaluator::new(&ctx).evaluate(&factor, &returns).unwrap();
    assert_eq!(report.aggregate.n_dates, 2);
    assert!(report.skip_counts.get(&SkipReason::DegenerateDistribution).copied().unwrap_or(0) >= 1);
}

#[rstest]
#[case(10, 3)]
#[case(23, 5)]
#[case(5, 5)]
#[case(101, 10)]
fn bucket_sizes_partition_the_cross_section(#[case] n: usize, #[case] g: usize) {
    let sizes = bucket_sizes(n, g);
    assert_eq!(sizes.len(), g);
    assert_eq!(sizes.iter().sum::<usize>(), n);
    let max = sizes.iter().max().unwrap();
    let min = sizes.iter().min().unwrap();
    assert!(max - min <= 1);
    assert!(sizes.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn bucketer_sizes_on_real_dates() {
    let ctx = ctx(EvalConfig {
        num_buckets: 5,
        ..Default::default()
    });
    let rows: Vec<(String, u64, f64)> = (0..23).map(|i| (format!("X{i:02}"), 0, f64::from(i))).collect();
    let borrowed: Vec<(&str, u64, f64)> = rows.iter().map(|(s, d, v)| (s.as_str(), *d, *v)).collect();
    let factor = series("f", &borrowed);
    let returns = returns_of(factor.renamed("r"));

    let analysis = QuantileBucketer::new(&ctx).apply(&factor, &returns);
    let sizes: Vec<usize> = analysis.on(day(0)).iter().map(|b| b.size).collect();
    assert_eq!(sizes, vec![5, 5, 5, 4, 4]);
    // bucket means rise with the factor when returns equal the factor
    let means: Vec<f64> = analysis.on(day(0)).iter().map(|b| b.mean_return).collect();
    assert!(means.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn rank_sum_is_mean_of_independent_ranks() {
    let ctx = ctx(EvalConfig::default());
    let mut rng = StdRng::seed_from_u64(9);
    let names = ["alpha", "beta", "gamma"];
    let mut raw: Vec<Vec<Observation>> = vec![Vec::new(); names.len()];
    for d in 0..4u64 {
        for i in 0..10u32 {
            let inst = format!("N{i}");
            for obs in &mut raw {
                // coarse values so ties occur
                let v = f64::from(rng.gen_range(0..5_u32));
                obs.push(Observation::new(inst.as_str(), day(d), v));
            }
        }
    }
    let factors: Vec<FactorSeries> = names
        .iter()
        .zip(raw)
        .map(|(n, obs)| FactorSeries::from_observations(*n, obs).unwrap())
        .collect();

    let combination = RankSumCombiner::new(&ctx).combine(&factors).unwrap();
    assert!(combination.weights.is_convex());
    assert_abs_diff_eq!(combination.weights.sum(), 1.0, epsilon = 1e-9);

    let mut expected: BTreeMap<(InstrumentId, Date), f64> = BTreeMap::new();
    for factor in &factors {
        for (date, members) in factor.cross_sections() {
            let values: Vec<f64> = members.iter().map(|m| m.1).collect();
            for (m, rank) in members.iter().zip(percentile_ranks(&values)) {
                *expected.entry((m.0.clone(), date)).or_default() += rank / factors.len() as f64;
            }
        }
    }
    assert_eq!(combination.composite.len(), expected.len());
    for ((inst, date), value) in &expected {
        assert_abs_diff_eq!(combination.composite.get(inst, *date).unwrap(), *value, epsilon = 1e-12);
    }
}

#[test]
fn regression_keeps_inverse_factor_negative() {
    let ctx = ctx(EvalConfig::default());
    let mut good = Vec::new();
    let mut inverse = Vec::new();
    let mut ret = Vec::new();
    for d in 0..6u64 {
        for i in 0..12u32 {
            let inst = format!("R{i:02}");
            let g = f64::from((i * 5 + d as u32) % 12);
            let b = f64::from((i * 7 + 3 * d as u32) % 12);
            good.push(Observation::new(inst.as_str(), day(d), g));
            inverse.push(Observation::new(inst.as_str(), day(d), b));
            ret.push(Observation::new(inst.as_str(), day(d), 0.003 * g - 0.002 * b));
        }
    }
    let factors = vec![
        FactorSeries::from_observations("good", good).unwrap(),
        FactorSeries::from_observations("inverse", inverse).unwrap(),
    ];
    let returns = returns_of(FactorSeries::from_observations("fwd_ret_1", ret).unwrap());

    let fit = RegressionCombiner::new(&ctx, returns.clone()).fit(&factors, &returns).unwrap();
    let weights = &fit.combination.weights;
    assert!(weights.get("good").unwrap() > 0.0);
    assert!(weights.get("inverse").unwrap() < 0.0);
    assert!(!weights.is_convex());
}

#[test]
fn worker_count_does_not_change_results() {
    let ctx = ctx(EvalConfig {
        horizon: 5,
        min_cross_section: 10,
        stability: ronda::traits::StabilityConfig {
            window: 10,
            ..Default::default()
        },
        ..Default::default()
    });
    let histories = universe(30, 80, 17);
    let momentum = FactorRegistry::with_defaults().get("momentum_10").unwrap();

    let report = |workers: usize| {
        let pre = Precomputer::new(&ctx, workers).unwrap();
        let factor = pre.factor_series(&histories, &momentum).unwrap();
        let returns = pre.forward_returns(&histories, 5, ReturnAnchor::CloseToClose).unwrap();
        FactorEvaluator::new(&ctx).evaluate(&factor, &returns).unwrap()
    };
    let single = report(1);
    let parallel = report(6);

    assert_eq!(single.aggregate, parallel.aggregate);
    assert_eq!(single.buckets.buckets, parallel.buckets.buckets);
    assert_eq!(single.skip_counts, parallel.skip_counts);
    assert_eq!(
        serde_json::to_string(&single).unwrap(),
        serde_json::to_string(&parallel).unwrap()
    );
}

#[test]
fn returns_after_cutoff_are_rejected() {
    let histories = universe(12, 30, 3);
    let ctx = ctx(EvalConfig {
        cutoff: Some(day(20)),
        min_cross_section: 5,
        ..Default::default()
    });
    let pre = Precomputer::new(&ctx, 2).unwrap();
    let factor = pre
        .factor_series(&histories, &FactorRegistry::with_defaults().get("rsi_5").unwrap())
        .unwrap();
    let returns = pre.forward_returns(&histories, 2, ReturnAnchor::CloseToClose).unwrap();

    let err = FactorEvaluator::new(&ctx).evaluate(&factor, &returns).unwrap_err();
    assert!(matches!(err, RondaError::LookAhead { cutoff, .. } if cutoff == day(20)));

    // ending the range at the cutoff makes the same inputs valid
    let bounded = ctx.derive(|c| c.end = Some(day(20))).unwrap();
    let report = FactorEvaluator::new(&bounded).evaluate(&factor, &returns).unwrap();
    assert!(report.daily.iter().all(|s| s.date <= day(20)));
}
