#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # ronda
//!
//! Cross-sectional factor evaluation and composite-signal engine.
//!
//! ronda is an umbrella crate that re-exports all ronda sub-crates for
//! convenience.
//!
//! ## Crate Organization
//!
//! - [`traits`] - Series, errors, configuration, context and statistics
//! - [`eval`] - Information coefficients, quantile buckets, stability, decay
//! - [`combine`] - Weight vectors and composite construction
//! - [`learn`] - Learned weights with date-ordered cross-validation
//! - [`signals`] - Price factor formulas and parallel precomputation
//!
//! ## Architecture
//!
//! 1. **Precomputation** turns per-instrument price histories into factor
//!    and forward-return series, one worker per instrument
//! 2. **Normalization** cleans each factor per date or per instrument
//! 3. **Evaluation** measures how well a factor ranks the cross-section
//! 4. **Combination** blends factors into one composite with explicit weights

/// Version information for the ronda crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Core Types
// ============================================================================

/// Core types shared by every ronda crate.
///
/// - [`FactorSeries`] and [`ReturnSeries`] - keyed values
/// - [`EvalConfig`] and [`EvalContext`] - run configuration and logging scope
/// - [`Diagnostics`] - per-unit skips recorded next to successful results
/// - [`Normalizer`] - winsorize, rank, robust and z-score transforms
pub mod traits {
    pub use ronda_traits::*;
}

pub use ronda_traits::{
    Date, Diagnostics, EvalConfig, EvalContext, FactorSeries, InstrumentId, Normalizer,
    Observation, PriceBar, PriceHistory, Result, ReturnAnchor, ReturnSeries, RondaError,
};

// ============================================================================
// Factor Evaluation
// ============================================================================

/// Single-factor evaluation.
///
/// ## Information Coefficient (IC)
///
/// Correlation between factor values and forward returns on one date:
///
/// ```text
/// IC_t = corr(factor_t, returns_{t -> t+horizon})
/// ```
///
/// Both Pearson and Spearman (average-rank) ICs are reported per date; the
/// configured one feeds the aggregate.
///
/// ## Information Ratio (IR)
///
/// ```text
/// IR = mean(IC) / std(IC)
/// ```
///
/// # Example
///
/// ```ignore
/// use ronda::eval::FactorEvaluator;
///
/// let report = FactorEvaluator::new(&ctx).evaluate(&factor, &returns)?;
/// println!("IC {:.4}  IR {:?}", report.aggregate.mean_ic, report.aggregate.information_ratio);
/// ```
pub mod eval {
    pub use ronda_eval::*;
}

pub use ronda_eval::{EvaluationReport, FactorEvaluator};

// ============================================================================
// Factor Combination
// ============================================================================

/// Composite construction.
///
/// ## Available Combiners
///
/// - **RankSumCombiner**: mean of per-date percentile ranks
/// - **IcWeightedCombiner**: standardized factors weighted by signed mean IC
/// - **RegressionCombiner**: OLS coefficients of returns on standardized factors
pub mod combine {
    pub use ronda_combine::*;
}

pub use ronda_combine::{Combination, Combiner, WeightVector};

// ============================================================================
// Learned Weights
// ============================================================================

/// Learned combination weights.
///
/// A [`learn::CombinationOptimizer`] searches a hyperparameter grid with
/// date-ordered folds, refits the best point and turns the model into a
/// weight vector: signed coefficients for the linear model, normalized
/// importances for tree ensembles and the network.
pub mod learn {
    pub use ronda_learn::*;
}

pub use ronda_learn::{CombinationOptimizer, Optimization};

// ============================================================================
// Signals
// ============================================================================

/// Factor definitions and precomputation.
pub mod signals {
    pub use ronda_signals::*;
}

pub use ronda_signals::{FactorRegistry, Precomputer};

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use ronda::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Combination, CombinationOptimizer, Combiner, Date, Diagnostics, EvalConfig, EvalContext,
        EvaluationReport, FactorEvaluator, FactorRegistry, FactorSeries, InstrumentId,
        Normalizer, Observation, Optimization, PriceBar, PriceHistory, Precomputer, Result,
        ReturnAnchor, ReturnSeries, RondaError, WeightVector,
    };
    pub use ronda_traits::{Axis, CombinationMode, IcMethod, ModelKind, NormalizeMethod};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_reexports_resolve() {
        let registry = FactorRegistry::with_defaults();
        assert!(registry.contains("momentum_20"));
        assert!(EvalConfig::default().validate().is_ok());
    }
}
