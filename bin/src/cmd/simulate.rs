//! Simulation command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use ronda_combine::{WeightVector, combiner_for};
use ronda_eval::{CorrelationMatrix, DecayAnalysis, EvaluationReport, FactorEvaluator};
use ronda_learn::CombinationOptimizer;
use ronda_signals::{FactorRegistry, Precomputer};
use ronda_traits::{EvalConfig, EvalContext, FactorSeries, Hyperparams, ModelKind};
use serde::Serialize;

use crate::synthetic;
use crate::{OutputFormat, SimulateArgs};

/// Factors evaluated when neither the flags nor the config name any.
const DEFAULT_FACTORS: [&str; 5] = ["momentum_20", "volatility_20", "rsi_14", "ma_deviation_20", "volume_ratio_20"];

/// Correlation above which two factors are reported as redundant.
const REDUNDANCY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Serialize)]
struct LearnedWeights {
    model: ModelKind,
    weights: WeightVector,
    best_params: Hyperparams,
    cv_mse: Option<f64>,
    in_sample_r2: f64,
    long_short_spread: Option<f64>,
    accepted: bool,
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    run_id: String,
    instruments: usize,
    days: usize,
    seed: u64,
    reports: Vec<EvaluationReport>,
    decay: BTreeMap<String, DecayAnalysis>,
    correlation: CorrelationMatrix,
    redundant_pairs: Vec<(String, String, f64)>,
    combination: String,
    combined_weights: WeightVector,
    composite: Option<EvaluationReport>,
    learned: Option<LearnedWeights>,
}

fn load_config(args: &SimulateArgs) -> Result<EvalConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            EvalConfig::from_json_str(&json)?
        }
        None => EvalConfig::default(),
    };
    if !args.factors.is_empty() {
        config.factors.clone_from(&args.factors);
    }
    if config.factors.is_empty() {
        config.factors = DEFAULT_FACTORS.iter().map(ToString::to_string).collect();
    }
    if let Some(h) = args.horizon {
        config.horizon = h;
    }
    if let Some(c) = args.combination {
        config.combination = c.into();
    }
    if let Some(m) = args.model {
        config.optimizer.model = m.into();
    }
    config.validate()?;
    Ok(config)
}

/// Generate a universe, evaluate every factor, then combine them.
pub(crate) fn run_simulation(args: &SimulateArgs) -> Result<()> {
    let config = load_config(args)?;
    let ctx = EvalContext::new(config)?;
    let cfg = ctx.config();
    let _run = ctx.span().enter();

    let histories = synthetic::universe(args.instruments, args.days, args.seed)?;
    let registry = FactorRegistry::with_defaults();
    let pre = Precomputer::new(&ctx, args.workers)?;
    let returns = pre.forward_returns(&histories, cfg.horizon, cfg.anchor)?;

    let evaluator = FactorEvaluator::new(&ctx);
    let mut factors: Vec<FactorSeries> = Vec::new();
    let mut reports = Vec::new();
    let mut decay = BTreeMap::new();
    for name in &cfg.factors {
        let definition = registry.get(name)?;
        let series = pre.factor_series(&histories, &definition)?;
        match evaluator.evaluate(&series, &returns) {
            Ok(report) => {
                let analysis =
                    DecayAnalysis::from_prices(&ctx, &series, &histories, &DecayAnalysis::short_term_horizons());
                decay.insert(name.clone(), analysis);
                reports.push(report);
                factors.push(series);
            }
            Err(err) => tracing::warn!(factor = %name, %err, "factor dropped"),
        }
    }
    if factors.is_empty() {
        bail!("no factor produced a usable evaluation");
    }

    let correlation = CorrelationMatrix::compute(&ctx, &factors);
    let redundant_pairs = correlation.redundant_pairs(REDUNDANCY_THRESHOLD);

    let combiner = combiner_for(&ctx, &returns);
    let combination = combiner.combine(&factors)?;
    let composite = match evaluator.evaluate(&combination.composite, &returns) {
        Ok(report) => Some(report),
        Err(err) => {
            tracing::warn!(%err, "composite could not be evaluated");
            None
        }
    };

    let learned = match CombinationOptimizer::new(&ctx).apply(&factors, &returns) {
        Ok(opt) => Some(LearnedWeights {
            model: opt.kind,
            long_short_spread: opt.quantile.long_short.as_ref().map(|ls| ls.mean),
            weights: opt.weights,
            best_params: opt.best_params,
            cv_mse: opt.cv_mse,
            in_sample_r2: opt.in_sample_r2,
            accepted: opt.accepted,
        }),
        Err(err) => {
            tracing::warn!(%err, "learned weighting failed");
            None
        }
    };

    let summary = SimulationSummary {
        run_id: ctx.run_id().to_string(),
        instruments: args.instruments,
        days: args.days,
        seed: args.seed,
        reports,
        decay,
        correlation,
        redundant_pairs,
        combination: combiner.name().to_string(),
        combined_weights: combination.weights,
        composite,
        learned,
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print_text(&summary),
    }
    Ok(())
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    v.map_or_else(|| "n/a".to_string(), |x| format!("{x:.precision$}"))
}

fn print_report_row(report: &EvaluationReport) {
    let agg = &report.aggregate;
    let skipped: usize = report.skip_counts.values().sum();
    println!(
        "  {:22} {:>6} {:>8.4} {:>8} {:>8} {:>7.1}% {:>9} {:>7}",
        report.factor,
        agg.n_dates,
        agg.mean_ic,
        fmt_opt(agg.information_ratio, 3),
        fmt_opt(agg.t_stat, 2),
        agg.positive_rate * 100.0,
        fmt_opt(report.buckets.long_short.as_ref().map(|ls| ls.mean), 5),
        skipped
    );
}

fn print_text(summary: &SimulationSummary) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                    Factor Simulation                         ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Run:         {}", summary.run_id);
    println!(
        "Universe:    {} instruments x {} bars (seed {})",
        summary.instruments, summary.days, summary.seed
    );
    println!();

    println!(
        "  {:22} {:>6} {:>8} {:>8} {:>8} {:>8} {:>9} {:>7}",
        "Factor", "Dates", "Mean IC", "IR", "t-stat", "IC>0", "L/S", "Skips"
    );
    println!("  {}", "-".repeat(84));
    for report in &summary.reports {
        print_report_row(report);
    }
    if let Some(ref composite) = summary.composite {
        print_report_row(composite);
    }
    println!();

    println!("IC decay (half-life in bars):");
    for (name, analysis) in &summary.decay {
        let peak = analysis
            .max_ic
            .map_or_else(|| "n/a".to_string(), |(h, ic)| format!("{ic:.4} @ {h}"));
        println!(
            "  {:22} half-life {:>8}  peak {}",
            name,
            fmt_opt(analysis.half_life, 1),
            peak
        );
    }
    println!();

    if summary.redundant_pairs.is_empty() {
        println!("No factor pair correlates above {REDUNDANCY_THRESHOLD}.");
    } else {
        println!("Redundant pairs (|corr| > {REDUNDANCY_THRESHOLD}):");
        for (a, b, c) in &summary.redundant_pairs {
            println!("  {a} ~ {b}: {c:.3}");
        }
    }
    println!();

    println!("Combination ({}):", summary.combination);
    for (name, w) in summary.combined_weights.iter() {
        println!("  {name:22} {w:>9.4}");
    }
    println!();

    match summary.learned {
        Some(ref learned) => {
            println!("Learned weights ({:?}):", learned.model);
            for (name, w) in learned.weights.iter() {
                println!("  {name:22} {w:>9.4}");
            }
            println!("  best params:  {:?}", learned.best_params.0);
            println!("  cv mse:       {}", fmt_opt(learned.cv_mse, 6));
            println!("  in-sample r2: {:.4}", learned.in_sample_r2);
            println!("  L/S spread:   {}", fmt_opt(learned.long_short_spread, 5));
            println!("  accepted:     {}", if learned.accepted { "yes" } else { "no" });
        }
        None => println!("Learned weights: unavailable"),
    }
    println!();
}
