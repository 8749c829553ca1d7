//! Single-factor evaluation for ronda.
//!
//! This crate scores one factor against forward returns:
//! - daily cross-sectional IC (Pearson and Spearman) and its aggregate
//! - quantile bucket returns and the long-short spread
//! - rolling pooled IC for stability
//! - IC decay across horizons and pairwise factor correlation
//!
//! # Example
//!
//! ```rust,ignore
//! use ronda_eval::{FactorEvaluator, calculate_ic};
//! use ronda_traits::{EvalConfig, EvalContext};
//!
//! // Spearman IC of two aligned slices
//! let ic = calculate_ic(&signal_scores, &forward_returns);
//!
//! // Full report for one factor
//! let ctx = EvalContext::new(EvalConfig::default())?;
//! let report = FactorEvaluator::new(&ctx).evaluate(&factor, &returns)?;
//! ```

pub mod correlation;
pub mod decay;
pub mod evaluator;
pub mod ic;
pub mod metrics;
pub mod quantile;
pub mod stability;

// Re-export main types
pub use correlation::CorrelationMatrix;
pub use decay::{DecayAnalysis, DecayCurve};
pub use evaluator::{EvaluationReport, FactorEvaluator};
pub use ic::{DailyIc, DailyStat, IcEngine, calculate_ic};
pub use metrics::AggregateStat;
pub use quantile::{Bucket, BucketAnalysis, BucketSummary, LongShort, QuantileBucketer, bucket_sizes};
pub use stability::{RollingIc, RollingIcPoint, StabilityAnalyzer};
