//! Parallel per-instrument precomputation.
//!
//! Each instrument is handled by one task that cleans its bars and computes
//! its values without touching any other instrument. Tasks hand back an
//! [`InstrumentResult`]; the caller-side merge sorts by instrument and date,
//! so the output never depends on the worker count or completion order.

use rayon::ThreadPool;
use rayon::prelude::*;
use ronda_traits::returns::forward_returns;
use ronda_traits::{
    EvalContext, FactorSeries, InstrumentId, Observation, PriceBar, PriceHistory, Result,
    ReturnAnchor, ReturnSeries, RondaError,
};

use crate::registry::FactorDefinition;

/// Output of one worker task.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentResult {
    /// Instrument the observations belong to.
    pub instrument: InstrumentId,
    /// Computed values, ascending by date.
    pub observations: Vec<Observation>,
    /// Bars removed while cleaning.
    pub dropped_bars: usize,
}

/// Sort bars by date, drop invalid prices and keep the first bar per date.
///
/// Returns the cleaned bars and how many were removed.
pub fn clean_bars(bars: &[PriceBar]) -> (Vec<PriceBar>, usize) {
    let mut cleaned: Vec<PriceBar> = bars.iter().filter(|b| b.is_valid()).copied().collect();
    cleaned.sort_by_key(|b| b.date);
    cleaned.dedup_by_key(|b| b.date);
    let dropped = bars.len() - cleaned.len();
    (cleaned, dropped)
}

/// Runs per-instrument work on a dedicated rayon pool.
///
/// # Example
///
/// ```rust,ignore
/// use ronda_signals::{FactorRegistry, Precomputer};
///
/// let pre = Precomputer::new(&ctx, 4)?;
/// let momentum = pre.factor_series(&histories, &FactorRegistry::with_defaults().get("momentum_20")?)?;
/// let returns = pre.forward_returns(&histories, 5, ReturnAnchor::CloseToClose)?;
/// ```
#[derive(Debug)]
pub struct Precomputer {
    ctx: EvalContext,
    workers: usize,
    pool: ThreadPool,
}

impl Precomputer {
    /// Build a pool of `workers` threads.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidConfig`] for zero workers or when the
    /// pool cannot be created.
    pub fn new(ctx: &EvalContext, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(RondaError::InvalidConfig("workers must be positive".into()));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ronda-precompute-{i}"))
            .build()
            .map_err(|e| RondaError::InvalidConfig(format!("failed to build worker pool: {e}")))?;
        Ok(Self {
            ctx: ctx.clone(),
            workers,
            pool,
        })
    }

    /// Number of worker threads.
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Compute `definition` for every instrument and merge into one series
    /// named after the definition.
    ///
    /// Instruments with fewer cleaned bars than the lookback contribute
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidData`] if an instrument appears in more
    /// than one history.
    pub fn factor_series(
        &self,
        histories: &[PriceHistory],
        definition: &FactorDefinition,
    ) -> Result<FactorSeries> {
        let _span = self.ctx.enter("precompute");
        let results = self.run(histories, |instrument, bars| {
            if bars.len() < definition.lookback {
                tracing::debug!(%instrument, bars = bars.len(), lookback = definition.lookback, "history shorter than lookback");
                return Vec::new();
            }
            bars.iter()
                .zip(definition.evaluate(bars))
                .filter_map(|(bar, value)| Some(Observation::new(instrument.clone(), bar.date, value?)))
                .collect()
        });
        merge(&definition.name, results)
    }

    /// Forward returns over `horizon` bars of each cleaned history.
    ///
    /// # Errors
    ///
    /// - [`RondaError::InvalidConfig`] for a zero horizon
    /// - [`RondaError::InvalidData`] if an instrument appears twice
    pub fn forward_returns(
        &self,
        histories: &[PriceHistory],
        horizon: usize,
        anchor: ReturnAnchor,
    ) -> Result<ReturnSeries> {
        if horizon == 0 {
            return Err(RondaError::InvalidConfig("horizon must be positive".into()));
        }
        let _span = self.ctx.enter("precompute");
        let results = self.run(histories, |instrument, bars| {
            let cleaned = PriceHistory {
                instrument: instrument.clone(),
                bars: bars.to_vec(),
            };
            forward_returns(&cleaned, horizon, anchor)
        });
        let series = merge(&format!("fwd_ret_{horizon}"), results)?;
        Ok(ReturnSeries::new(series, horizon, anchor))
    }

    fn run<F>(&self, histories: &[PriceHistory], work: F) -> Vec<InstrumentResult>
    where
        F: Fn(&InstrumentId, &[PriceBar]) -> Vec<Observation> + Sync,
    {
        self.pool.install(|| {
            histories
                .par_iter()
                .map(|history| {
                    let (bars, dropped_bars) = clean_bars(&history.bars);
                    InstrumentResult {
                        instrument: history.instrument.clone(),
                        observations: work(&history.instrument, &bars),
                        dropped_bars,
                    }
                })
                .collect()
        })
    }
}

/// Deterministic merge: sort by instrument, then date, then build the series.
fn merge(name: &str, mut results: Vec<InstrumentResult>) -> Result<FactorSeries> {
    results.sort_by(|a, b| a.instrument.cmp(&b.instrument));
    let dropped: usize = results.iter().map(|r| r.dropped_bars).sum();
    let instruments = results.len();

    let mut observations: Vec<Observation> = results.into_iter().flat_map(|r| r.observations).collect();
    observations.sort_by(|a, b| a.instrument.cmp(&b.instrument).then(a.date.cmp(&b.date)));
    let series = FactorSeries::from_observations(name, observations)?;

    tracing::info!(
        series = name,
        instruments,
        observations = series.len(),
        dropped_bars = dropped,
        "precomputed"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use ronda_traits::Date;

    use super::*;
    use crate::registry::FactorRegistry;

    fn history(name: &str, closes: &[f64]) -> PriceHistory {
        let start = Date::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                date: start + chrono::Days::new(i as u64),
                open: c * 0.99,
                high: c * 1.01,
                low: c * 0.98,
                close: c,
                volume: 1e5,
            })
            .collect();
        PriceHistory {
            instrument: InstrumentId::from(name),
            bars,
        }
    }

    fn universe(n: usize) -> Vec<PriceHistory> {
        (0..n)
            .map(|i| {
                let closes: Vec<f64> = (0..40)
                    .map(|t| 50.0 + i as f64 + ((t * (i + 3)) % 11) as f64)
                    .collect();
                history(&format!("S{i:03}"), &closes)
            })
            .collect()
    }

    #[test]
    fn test_worker_count_does_not_change_output() {
        let ctx = EvalContext::default();
        let histories = universe(25);
        let def = FactorRegistry::with_defaults().get("momentum_5").unwrap();

        let one = Precomputer::new(&ctx, 1).unwrap();
        let many = Precomputer::new(&ctx, 4).unwrap();
        assert_eq!(
            one.factor_series(&histories, &def).unwrap(),
            many.factor_series(&histories, &def).unwrap()
        );

        let mut reversed = histories.clone();
        reversed.reverse();
        assert_eq!(
            one.forward_returns(&histories, 3, ReturnAnchor::CloseToClose).unwrap(),
            many.forward_returns(&reversed, 3, ReturnAnchor::CloseToClose).unwrap()
        );
    }

    #[test]
    fn test_cleaning() {
        let mut h = history("A", &[10.0, 11.0, 12.0, 13.0]);
        h.bars[1].close = f64::NAN;
        let duplicate = h.bars[3];
        h.bars.push(duplicate);
        h.bars.swap(0, 2);

        let (bars, dropped) = clean_bars(&h.bars);
        assert_eq!(dropped, 2);
        assert_eq!(bars.iter().map(|b| b.close).collect::<Vec<_>>(), vec![10.0, 12.0, 13.0]);

        let pre = Precomputer::new(&EvalContext::default(), 2).unwrap();
        let returns = pre.forward_returns(&[h], 1, ReturnAnchor::CloseToClose).unwrap();
        assert_eq!(returns.series().len(), 2);
        assert_eq!(returns.series().name(), "fwd_ret_1");
    }

    #[test]
    fn test_short_history_contributes_nothing() {
        let def = FactorRegistry::with_defaults().get("max_drawdown_10").unwrap();
        let pre = Precomputer::new(&EvalContext::default(), 2).unwrap();
        let series = pre
            .factor_series(&[history("A", &[1.0; 5]), history("B", &[1.0; 12])], &def)
            .unwrap();
        assert_eq!(series.instruments(), vec![InstrumentId::from("B")]);
        assert_eq!(series.len(), 3);
        assert_eq!(series.name(), "max_drawdown_10");
    }

    #[test]
    fn test_errors() {
        let ctx = EvalContext::default();
        assert!(matches!(Precomputer::new(&ctx, 0), Err(RondaError::InvalidConfig(_))));

        let pre = Precomputer::new(&ctx, 1).unwrap();
        let h = history("A", &[1.0, 2.0, 3.0]);
        assert!(matches!(
            pre.forward_returns(&[h.clone()], 0, ReturnAnchor::CloseToClose),
            Err(RondaError::InvalidConfig(_))
        ));
        assert!(matches!(
            pre.forward_returns(&[h.clone(), h], 1, ReturnAnchor::CloseToClose),
            Err(RondaError::InvalidData(_))
        ));
    }
}
