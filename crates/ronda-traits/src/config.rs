//! Run configuration.
//!
//! Every knob the engine consumes lives in [`EvalConfig`]. It deserializes
//! from JSON with missing fields taking their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RondaError};
use crate::grid::HyperparamGrid;
use crate::types::Date;

/// Axis along which normalization groups observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Group by instrument: de-trend each instrument's own history.
    Time,
    /// Group by date: compare instruments on the same day.
    #[default]
    CrossSection,
}

/// Normalization transform applied within each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMethod {
    /// Z-score with sample standard deviation.
    #[default]
    Standardize,
    /// Clip to the configured quantiles, then z-score.
    Winsorize,
    /// Percentile rank in (0, 1], ties averaged.
    Rank,
    /// Clip to median +/- k scaled MADs, then z-score.
    Robust,
}

/// Correlation used for an IC statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IcMethod {
    /// Sample correlation of raw values.
    Pearson,
    /// Pearson correlation of average ranks.
    #[default]
    Spearman,
}

/// How several factors become one composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationMode {
    /// Equal-weight mean of per-date percentile ranks.
    #[default]
    RankSum,
    /// Normalized factors times externally supplied weights.
    IcWeighted,
    /// OLS coefficients of returns on standardized factors.
    Regression,
}

/// Model family for learned weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Ordinary least squares, optional ridge penalty.
    #[default]
    Linear,
    /// Bagged regression trees.
    RandomForest,
    /// Gradient-boosted regression trees.
    GradientBoosting,
    /// One-hidden-layer network.
    Mlp,
}

/// Price pair a forward return is measured between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnAnchor {
    /// `close[t + H] / close[t] - 1`.
    #[default]
    CloseToClose,
    /// `open[t + H] / close[t] - 1`.
    CloseToOpen,
}

/// Normalization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Grouping axis.
    pub axis: Axis,
    /// Transform.
    pub method: NormalizeMethod,
    /// Lower and upper quantiles for winsorizing.
    pub winsorize_limits: (f64, f64),
    /// Number of scaled MADs kept by robust clipping.
    pub mad_multiplier: f64,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            axis: Axis::CrossSection,
            method: NormalizeMethod::Standardize,
            winsorize_limits: (0.01, 0.99),
            mad_multiplier: 3.0,
        }
    }
}

/// Rolling IC settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Number of consecutive dates per window.
    pub window: usize,
    /// Minimum pooled pairs per window.
    pub min_observations: usize,
    /// Correlation of the pooled sample.
    pub method: IcMethod,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            window: 60,
            min_observations: 10,
            method: IcMethod::Pearson,
        }
    }
}

/// Learned-weight search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Model family.
    pub model: ModelKind,
    /// Hyperparameter grid searched with date-ordered CV.
    pub grid: HyperparamGrid,
    /// Number of validation folds.
    pub n_splits: usize,
    /// Dates purged before each validation block; defaults to the horizon.
    pub gap: Option<usize>,
    /// Seed for every random draw.
    pub seed: u64,
    /// Minimum long-short spread for a weighting to be accepted.
    pub min_long_short_spread: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Linear,
            grid: HyperparamGrid::default(),
            n_splits: 5,
            gap: None,
            seed: 42,
            min_long_short_spread: 0.0,
        }
    }
}

/// Configuration for one evaluation or combination run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Factor names to evaluate.
    pub factors: Vec<String>,
    /// First date included (inclusive).
    pub start: Option<Date>,
    /// Last date included (inclusive).
    pub end: Option<Date>,
    /// Latest date a return may carry; defaults to `end`.
    pub cutoff: Option<Date>,
    /// Forward-return horizon in periods.
    pub horizon: usize,
    /// Forward-return price anchor.
    pub anchor: ReturnAnchor,
    /// Number of quantile buckets.
    pub num_buckets: usize,
    /// Minimum joined cross-section for a daily IC.
    pub min_cross_section: usize,
    /// Which daily IC feeds the aggregate.
    pub ic_method: IcMethod,
    /// Normalization settings.
    pub normalization: NormalizationConfig,
    /// Rolling IC settings.
    pub stability: StabilityConfig,
    /// Combination mode.
    pub combination: CombinationMode,
    /// Learned-weight settings.
    pub optimizer: OptimizerConfig,
    /// Periods per year for annualization.
    pub trading_days_per_year: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            factors: Vec::new(),
            start: None,
            end: None,
            cutoff: None,
            horizon: 10,
            anchor: ReturnAnchor::CloseToClose,
            num_buckets: 5,
            min_cross_section: 20,
            ic_method: IcMethod::Spearman,
            normalization: NormalizationConfig::default(),
            stability: StabilityConfig::default(),
            combination: CombinationMode::RankSum,
            optimizer: OptimizerConfig::default(),
            trading_days_per_year: 252,
        }
    }
}

impl EvalConfig {
    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Cutoff actually enforced: `cutoff`, else `end`.
    pub const fn effective_cutoff(&self) -> Option<Date> {
        match self.cutoff {
            Some(c) => Some(c),
            None => self.end,
        }
    }

    /// Purge gap actually used by cross-validation.
    pub fn effective_gap(&self) -> usize {
        self.optimizer.gap.unwrap_or(self.horizon)
    }

    /// Reject settings no component can honor.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RondaError::InvalidConfig(msg));

        if self.horizon == 0 {
            return invalid("horizon must be positive".into());
        }
        if self.num_buckets < 2 {
            return invalid(format!("num_buckets must be at least 2, got {}", self.num_buckets));
        }
        if self.min_cross_section < 2 {
            return invalid(format!(
                "min_cross_section must be at least 2, got {}",
                self.min_cross_section
            ));
        }
        if self.stability.window == 0 {
            return invalid("stability.window must be positive".into());
        }
        let (lo, hi) = self.normalization.winsorize_limits;
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo >= hi {
            return invalid(format!("winsorize_limits must satisfy 0 <= lo < hi <= 1, got ({lo}, {hi})"));
        }
        let k = self.normalization.mad_multiplier;
        if k.is_nan() || k <= 0.0 {
            return invalid("mad_multiplier must be positive".into());
        }
        if let (Some(start), Some(end)) = (self.start, self.end)
            && start > end
        {
            return invalid(format!("start {start} is after end {end}"));
        }
        if self.optimizer.n_splits == 0 {
            return invalid("optimizer.n_splits must be positive".into());
        }
        if self.trading_days_per_year == 0 {
            return invalid("trading_days_per_year must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = EvalConfig::default();
        assert_eq!(config.horizon, 10);
        assert_eq!(config.num_buckets, 5);
        assert_eq!(config.min_cross_section, 20);
        assert_eq!(config.ic_method, IcMethod::Spearman);
        assert_eq!(config.stability.window, 60);
        assert_eq!(config.optimizer.seed, 42);
        assert_eq!(config.effective_gap(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = EvalConfig::from_json_str(
            r#"{"horizon": 5, "normalization": {"method": "rank"}, "anchor": "close_to_open"}"#,
        )
        .unwrap();
        assert_eq!(config.horizon, 5);
        assert_eq!(config.normalization.method, NormalizeMethod::Rank);
        assert_eq!(config.normalization.winsorize_limits, (0.01, 0.99));
        assert_eq!(config.anchor, ReturnAnchor::CloseToOpen);
    }

    #[test]
    fn test_cutoff_defaults_to_end() {
        let end = Date::from_ymd_opt(2024, 6, 30).unwrap();
        let config = EvalConfig {
            end: Some(end),
            ..Default::default()
        };
        assert_eq!(config.effective_cutoff(), Some(end));
    }

    #[rstest]
    #[case::zero_horizon(EvalConfig { horizon: 0, ..Default::default() })]
    #[case::one_bucket(EvalConfig { num_buckets: 1, ..Default::default() })]
    #[case::zero_window(EvalConfig {
        stability: StabilityConfig { window: 0, ..Default::default() },
        ..Default::default()
    })]
    #[case::inverted_limits(EvalConfig {
        normalization: NormalizationConfig { winsorize_limits: (0.9, 0.1), ..Default::default() },
        ..Default::default()
    })]
    #[case::start_after_end(EvalConfig {
        start: Date::from_ymd_opt(2024, 2, 1),
        end: Date::from_ymd_opt(2024, 1, 1),
        ..Default::default()
    })]
    fn test_validate_rejects(#[case] config: EvalConfig) {
        assert!(matches!(config.validate(), Err(RondaError::InvalidConfig(_))));
    }
}
