//! Aggregate IC statistics.
//!
//! This module turns a series of IC values (daily or rolling) into:
//! - mean and sample standard deviation
//! - Information Ratio: mean IC / std IC, explicitly undefined when std IC = 0
//! - hit rate: fraction of positive ICs
//! - t-statistic of the mean

use ronda_traits::stats::{self, MIN_STD_THRESHOLD};
use ronda_traits::{Result, RondaError};
use serde::{Deserialize, Serialize};

/// Aggregate of an IC series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStat {
    /// Mean IC
    pub mean_ic: f64,
    /// Sample standard deviation of IC (0 for a single value)
    pub std_ic: f64,
    /// mean_ic / std_ic; `None` when std_ic is zero
    pub information_ratio: Option<f64>,
    /// Fraction of values strictly above zero
    pub positive_rate: f64,
    /// Number of values aggregated
    pub n_dates: usize,
    /// mean_ic / (std_ic / sqrt(n)); `None` when std_ic is zero
    pub t_stat: Option<f64>,
}

impl AggregateStat {
    /// Aggregate IC values. Non-finite entries are ignored.
    ///
    /// # Arguments
    ///
    /// * `ics` - IC values, one per date or window
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::NoUsableData`] when no finite value remains.
    ///
    /// # Example
    ///
    /// ```
    /// use ronda_eval::AggregateStat;
    ///
    /// let agg = AggregateStat::from_values(&[0.05, 0.03, 0.07]).unwrap();
    /// assert_eq!(agg.n_dates, 3);
    /// assert!(agg.information_ratio.is_some());
    ///
    /// let flat = AggregateStat::from_values(&[1.0, 1.0]).unwrap();
    /// assert!(flat.information_ratio.is_none());
    /// ```
    pub fn from_values(ics: &[f64]) -> Result<Self> {
        let valid: Vec<f64> = ics.iter().copied().filter(|x| x.is_finite()).collect();
        let n_dates = valid.len();
        let mean_ic = stats::mean(&valid)
            .ok_or_else(|| RondaError::NoUsableData("no IC values to aggregate".into()))?;
        let std_ic = stats::sample_std(&valid).unwrap_or(0.0);

        let defined = std_ic > MIN_STD_THRESHOLD;
        let information_ratio = defined.then(|| mean_ic / std_ic);
        let t_stat = defined.then(|| mean_ic / (std_ic / (n_dates as f64).sqrt()));
        let positive_rate = valid.iter().filter(|&&ic| ic > 0.0).count() as f64 / n_dates as f64;

        Ok(Self {
            mean_ic,
            std_ic,
            information_ratio,
            positive_rate,
            n_dates,
            t_stat,
        })
    }

    /// Information Ratio, or [`RondaError::UndefinedRatio`] when std IC is zero.
    pub fn ir(&self) -> Result<f64> {
        self.information_ratio.ok_or_else(|| {
            RondaError::UndefinedRatio(format!(
                "std_ic is zero over {} values (mean_ic = {:.6})",
                self.n_dates, self.mean_ic
            ))
        })
    }

    /// IR scaled by `sqrt(periods_per_year)`.
    pub fn annualized_ir(&self, periods_per_year: usize) -> Option<f64> {
        self.information_ratio
            .map(|ir| ir * (periods_per_year as f64).sqrt())
    }

    /// Standard error of the mean IC.
    pub fn std_error(&self) -> f64 {
        if self.n_dates == 0 {
            return f64::NAN;
        }
        self.std_ic / (self.n_dates as f64).sqrt()
    }
}
