//! Factor combination strategies for ronda.
//!
//! This crate merges several factors into one composite score. It implements
//! equal-weighted rank-sum, IC-weighted and regression-weighted strategies,
//! all producing a [`Combination`]: the composite series plus the
//! [`WeightVector`] that built it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use ronda_combine::combiner_for;
//! use ronda_traits::{EvalConfig, EvalContext};
//!
//! # fn run(factors: Vec<ronda_traits::FactorSeries>, returns: ronda_traits::ReturnSeries) -> ronda_traits::Result<()> {
//! let ctx = EvalContext::new(EvalConfig::default())?;
//! let combiner = combiner_for(&ctx, &returns);
//! let combination = combiner.combine(&factors)?;
//! println!("{} weights: {:?}", combiner.name(), combination.weights);
//! # Ok(())
//! # }
//! ```

mod combiner;
mod ic_weight;
mod rank_sum;
mod regression;
mod weights;

use ronda_traits::{CombinationMode, EvalContext, ReturnSeries};

// Re-export main types
pub use combiner::{Combination, Combiner, combine_weighted};
pub use ic_weight::{IcWeightedCombiner, WeightSource};
pub use rank_sum::RankSumCombiner;
pub use regression::{RegressionCombiner, RegressionFit};
pub use weights::WeightVector;

/// The combiner selected by `ctx.config().combination`.
///
/// IC-weighted combination measures each factor's mean IC against
/// `returns`; regression combination fits on them. Rank-sum ignores them.
pub fn combiner_for(ctx: &EvalContext, returns: &ReturnSeries) -> Box<dyn Combiner> {
    match ctx.config().combination {
        CombinationMode::RankSum => Box::new(RankSumCombiner::new(ctx)),
        CombinationMode::IcWeighted => Box::new(IcWeightedCombiner::from_returns(ctx, returns.clone())),
        CombinationMode::Regression => Box::new(RegressionCombiner::new(ctx, returns.clone())),
    }
}
