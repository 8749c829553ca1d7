//! Forward returns over a fixed horizon.

use serde::{Deserialize, Serialize};

use crate::config::ReturnAnchor;
use crate::error::{Result, RondaError};
use crate::series::FactorSeries;
use crate::types::{Date, Observation, PriceHistory};

/// Realized forward returns over `horizon` periods.
///
/// The value dated `t` is computed from the bar at `t` and the bar at
/// `t + horizon` only. Later bars never influence earlier values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    horizon: usize,
    anchor: ReturnAnchor,
    series: FactorSeries,
}

impl ReturnSeries {
    /// Wrap externally computed returns.
    pub const fn new(series: FactorSeries, horizon: usize, anchor: ReturnAnchor) -> Self {
        Self {
            horizon,
            anchor,
            series,
        }
    }

    /// Compute forward returns from price histories.
    ///
    /// For each instrument and each index `t` with a bar at `t + horizon`:
    ///
    /// - [`ReturnAnchor::CloseToClose`]: `close[t + H] / close[t] - 1`
    /// - [`ReturnAnchor::CloseToOpen`]: `open[t + H] / close[t] - 1`
    ///
    /// The last `horizon` bars of each instrument get no value.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidConfig`] for a zero horizon and
    /// [`RondaError::InvalidData`] if an instrument appears twice.
    pub fn from_prices(
        histories: &[PriceHistory],
        horizon: usize,
        anchor: ReturnAnchor,
    ) -> Result<Self> {
        if horizon == 0 {
            return Err(RondaError::InvalidConfig("horizon must be positive".into()));
        }

        let mut observations = Vec::new();
        for history in histories {
            observations.extend(forward_returns(history, horizon, anchor));
        }

        let series = FactorSeries::from_observations(format!("fwd_ret_{horizon}"), observations)?;
        Ok(Self::new(series, horizon, anchor))
    }

    /// Horizon in periods.
    pub const fn horizon(&self) -> usize {
        self.horizon
    }

    /// Price anchor used to compute the returns.
    pub const fn anchor(&self) -> ReturnAnchor {
        self.anchor
    }

    /// The underlying keyed values.
    pub const fn series(&self) -> &FactorSeries {
        &self.series
    }

    /// Restrict to dates in `[start, end]`.
    pub fn restrict_range(&self, start: Option<Date>, end: Option<Date>) -> Self {
        Self {
            horizon: self.horizon,
            anchor: self.anchor,
            series: self.series.restrict_range(start, end),
        }
    }

    /// Verify that no return is dated after `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::LookAhead`] naming the latest offending date.
    pub fn ensure_not_after(&self, cutoff: Date) -> Result<()> {
        match self.series.dates().last() {
            Some(&date) if date > cutoff => Err(RondaError::LookAhead { date, cutoff }),
            _ => Ok(()),
        }
    }
}

/// Forward returns of one instrument.
pub fn forward_returns(
    history: &PriceHistory,
    horizon: usize,
    anchor: ReturnAnchor,
) -> Vec<Observation> {
    let bars = &history.bars;
    if horizon == 0 || bars.len() <= horizon {
        return Vec::new();
    }

    bars.iter()
        .zip(bars.iter().skip(horizon))
        .filter_map(|(start, end)| {
            let base = start.close;
            let exit = match anchor {
                ReturnAnchor::CloseToClose => end.close,
                ReturnAnchor::CloseToOpen => end.open,
            };
            if !(base.is_finite() && base > 0.0 && exit.is_finite()) {
                return None;
            }
            Some(Observation::new(
                history.instrument.clone(),
                start.date,
                exit / base - 1.0,
            ))
        })
        .collect()
}
