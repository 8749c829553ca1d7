//! Per-instrument factor formulas.
//!
//! Every formula takes one instrument's bars, ascending by date, and returns
//! one value per bar. The value at index `t` reads bars `..=t` only; indexes
//! without a full window are `None`.

use ronda_traits::PriceBar;
use ronda_traits::stats::MIN_STD_THRESHOLD;

use crate::registry::FactorParams;

fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample standard deviation; `None` below two values.
fn sample_std(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    Some(var.sqrt())
}

/// Apply `f` to every trailing window of `len` values.
fn trailing(values: &[f64], len: usize, f: impl Fn(&[f64]) -> Option<f64>) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|t| {
            if len == 0 || t + 1 < len {
                None
            } else {
                f(&values[t + 1 - len..=t]).filter(|v| v.is_finite())
            }
        })
        .collect()
}

/// Simple returns; the first entry has no predecessor.
fn daily_returns(closes: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(closes.len());
    out.push(f64::NAN);
    out.extend(closes.windows(2).map(|w| w[1] / w[0] - 1.0));
    out
}

/// `close[t] / close[t - window] - 1`.
pub fn momentum(bars: &[PriceBar], params: &FactorParams) -> Vec<Option<f64>> {
    let w = params.window();
    trailing(&closes(bars), w + 1, |x| Some(x[w] / x[0] - 1.0))
}

/// Sample standard deviation of the last `window` daily returns.
pub fn volatility(bars: &[PriceBar], params: &FactorParams) -> Vec<Option<f64>> {
    let returns = daily_returns(&closes(bars));
    // the leading NaN return keeps the first full window at index `window`
    trailing(&returns, params.window(), sample_std)
}

/// Relative strength index from simple average gains and losses, in `[0, 100]`.
///
/// A window with no losses is 100; a window with no moves at all is `None`.
pub fn rsi(bars: &[PriceBar], params: &FactorParams) -> Vec<Option<f64>> {
    let c = closes(bars);
    let w = params.window();
    trailing(&c, w + 1, |x| {
        let (mut gain, mut loss) = (0.0, 0.0);
        for pair in x.windows(2) {
            let d = pair[1] - pair[0];
            if d > 0.0 {
                gain += d;
            } else {
                loss -= d;
            }
        }
        if loss == 0.0 {
            return (gain > 0.0).then_some(100.0);
        }
        Some(100.0 - 100.0 / (1.0 + gain / loss))
    })
}

/// `close / SMA(close, window) - 1`.
pub fn ma_deviation(bars: &[PriceBar], params: &FactorParams) -> Vec<Option<f64>> {
    trailing(&closes(bars), params.window(), |x| {
        x.last().map(|last| last / mean(x) - 1.0)
    })
}

/// `volume / SMA(volume, window)`; `None` when the average volume is zero.
pub fn volume_ratio(bars: &[PriceBar], params: &FactorParams) -> Vec<Option<f64>> {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    trailing(&volumes, params.window(), |x| {
        let avg = mean(x);
        if avg <= 0.0 {
            return None;
        }
        x.last().map(|last| last / avg)
    })
}

/// Worst peak-to-trough decline inside the last `window` closes, as a
/// non-positive fraction.
pub fn max_drawdown(bars: &[PriceBar], params: &FactorParams) -> Vec<Option<f64>> {
    trailing(&closes(bars), params.window(), |x| {
        let mut peak = f64::MIN;
        let mut worst = 0.0_f64;
        for &p in x {
            peak = peak.max(p);
            worst = worst.min((p - peak) / peak);
        }
        Some(worst)
    })
}

/// Position of the close inside Bollinger bands of `width` standard
/// deviations around the `window` SMA: 0 at the lower band, 1 at the upper.
pub fn bollinger_position(bars: &[PriceBar], params: &FactorParams) -> Vec<Option<f64>> {
    let width = params.get_or("width", 2.0);
    trailing(&closes(bars), params.window(), |x| {
        let std = sample_std(x)?;
        if std < MIN_STD_THRESHOLD {
            return None;
        }
        let mid = mean(x);
        let lower = mid - width * std;
        let upper = mid + width * std;
        x.last().map(|last| (last - lower) / (upper - lower))
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ronda_traits::Date;

    use super::*;
    use crate::registry::Formula;

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        let start = Date::from_ymd_opt(2024, 3, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar {
                date: start + chrono::Days::new(i as u64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1000.0 * (i + 1) as f64,
            })
            .collect()
    }

    fn window(w: usize) -> FactorParams {
        FactorParams::default().with("window", w as f64)
    }

    #[test]
    fn test_momentum() {
        let out = momentum(&bars(&[100.0, 110.0, 121.0]), &window(1));
        assert_eq!(out[0], None);
        assert_abs_diff_eq!(out[1].unwrap(), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(out[2].unwrap(), 0.1, epsilon = 1e-12);

        let out = momentum(&bars(&[100.0, 110.0, 121.0]), &window(2));
        assert_eq!(&out[..2], &[None, None]);
        assert_abs_diff_eq!(out[2].unwrap(), 0.21, epsilon = 1e-12);
    }

    #[test]
    fn test_volatility_needs_full_return_window() {
        let out = volatility(&bars(&[100.0, 101.0, 99.0, 102.0]), &window(2));
        assert_eq!(&out[..2], &[None, None]);
        assert!(out[2].unwrap() > 0.0);

        let flat = volatility(&bars(&[100.0, 110.0, 121.0, 133.1]), &window(2));
        assert_abs_diff_eq!(flat[3].unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rsi_bounds() {
        let up = rsi(&bars(&[1.0, 2.0, 3.0, 4.0]), &window(3));
        assert_eq!(up[3], Some(100.0));

        let mixed = rsi(&bars(&[10.0, 11.0, 10.0]), &window(2));
        assert_abs_diff_eq!(mixed[2].unwrap(), 50.0, epsilon = 1e-12);

        let flat = rsi(&bars(&[5.0, 5.0, 5.0]), &window(2));
        assert_eq!(flat[2], None);
    }

    #[test]
    fn test_ma_deviation_and_volume_ratio() {
        let out = ma_deviation(&bars(&[10.0, 10.0, 13.0]), &window(3));
        assert_abs_diff_eq!(out[2].unwrap(), 13.0 / 11.0 - 1.0, epsilon = 1e-12);

        // volumes 1000, 2000, 3000
        let out = volume_ratio(&bars(&[1.0, 1.0, 1.0]), &window(3));
        assert_abs_diff_eq!(out[2].unwrap(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_max_drawdown() {
        let out = max_drawdown(&bars(&[100.0, 120.0, 90.0, 100.0]), &window(4));
        assert_eq!(&out[..3], &[None, None, None]);
        assert_abs_diff_eq!(out[3].unwrap(), -0.25, epsilon = 1e-12);

        let rising = max_drawdown(&bars(&[1.0, 2.0, 3.0]), &window(2));
        assert_eq!(rising[2], Some(0.0));
    }

    #[test]
    fn test_bollinger_position() {
        let out = bollinger_position(&bars(&[1.0, 2.0, 3.0]), &window(3));
        // mean 2, std 1: bands [0, 4], close 3 sits at 0.75
        assert_abs_diff_eq!(out[2].unwrap(), 0.75, epsilon = 1e-12);

        let flat = bollinger_position(&bars(&[2.0, 2.0, 2.0]), &window(3));
        assert_eq!(flat[2], None);
    }

    #[test]
    fn test_no_look_ahead() {
        let base = [100.0, 102.0, 99.0, 101.0, 104.0, 103.0];
        let mut shocked = base;
        shocked[5] = 500.0;
        let formulas: [Formula; 6] = [momentum, volatility, rsi, ma_deviation, max_drawdown, bollinger_position];
        for f in formulas {
            let a = f(&bars(&base), &window(3));
            let b = f(&bars(&shocked), &window(3));
            assert_eq!(&a[..5], &b[..5]);
        }
    }
}
