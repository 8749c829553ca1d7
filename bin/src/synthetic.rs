//! Seeded synthetic market data.
//!
//! Each instrument has a persistent drift drawn once, so trend-following
//! factors carry real but noisy information about forward returns.

use anyhow::{Context, Result};
use chrono::Days;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, LogNormal, Normal};
use ronda_traits::{Date, PriceBar, PriceHistory};

/// Daily volatility of the idiosyncratic shock.
const DAILY_VOL: f64 = 0.02;
/// Dispersion of per-instrument drifts.
const DRIFT_DISPERSION: f64 = 0.001;

/// Generate `instruments` histories of `days` bars starting 2020-01-01.
pub(crate) fn universe(instruments: usize, days: usize, seed: u64) -> Result<Vec<PriceHistory>> {
    let start = Date::from_ymd_opt(2020, 1, 1).context("invalid start date")?;
    let mut rng = StdRng::seed_from_u64(seed);
    let drift = Normal::new(0.0, DRIFT_DISPERSION)?;
    let shock = Normal::new(0.0, DAILY_VOL)?;
    let gap = Normal::new(0.0, DAILY_VOL / 4.0)?;
    let volume = LogNormal::new(11.5, 0.4)?;

    let mut histories = Vec::with_capacity(instruments);
    for i in 0..instruments {
        let mu = drift.sample(&mut rng);
        let mut close = 20.0 + 5.0 * (i % 17) as f64;
        let mut bars = Vec::with_capacity(days);
        for t in 0..days {
            let open = close * (1.0 + gap.sample(&mut rng));
            close *= (mu + shock.sample(&mut rng)).exp();
            let (hi, lo) = (open.max(close), open.min(close));
            bars.push(PriceBar {
                date: start + Days::new(t as u64),
                open,
                high: hi * 1.005,
                low: lo * 0.995,
                close,
                volume: volume.sample(&mut rng),
            });
        }
        histories.push(PriceHistory::new(format!("SYN{i:04}"), bars));
    }
    tracing::debug!(instruments, days, seed, "synthetic universe generated");
    Ok(histories)
}
