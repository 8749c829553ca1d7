//! IC-weighted factor combination strategy.

use ronda_eval::IcEngine;
use ronda_traits::{
    Diagnostics, EvalContext, FactorSeries, NormalizeMethod, Normalizer, Result, ReturnSeries,
};

use crate::combiner::{Combination, Combiner, combine_weighted};
use crate::weights::WeightVector;

/// Where the IC weights come from.
#[derive(Debug, Clone)]
pub enum WeightSource {
    /// Weights supplied by the caller, for example from an earlier evaluation.
    Fixed(WeightVector),
    /// Each factor's aggregate mean IC against these returns, measured at combine time.
    MeanIc(ReturnSeries),
}

/// IC-weighted combiner.
///
/// Factors are standardized along the configured axis, multiplied by their
/// weight and summed. Weights are used as given: they keep their sign and
/// are not rescaled to sum to 1.
///
/// # Examples
///
/// ```rust,no_run
/// use ronda_combine::{Combiner, IcWeightedCombiner, WeightVector};
/// use ronda_traits::EvalContext;
///
/// # fn run(momentum: ronda_traits::FactorSeries, value: ronda_traits::FactorSeries) -> ronda_traits::Result<()> {
/// let weights = WeightVector::new([(momentum.name(), 0.05), (value.name(), 0.03)])?;
/// let combiner = IcWeightedCombiner::new(&EvalContext::default(), weights);
/// let combination = combiner.combine(&[momentum, value])?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IcWeightedCombiner {
    ctx: EvalContext,
    source: WeightSource,
}

impl IcWeightedCombiner {
    /// Combiner with fixed weights.
    pub fn new(ctx: &EvalContext, weights: WeightVector) -> Self {
        Self {
            ctx: ctx.clone(),
            source: WeightSource::Fixed(weights),
        }
    }

    /// Combiner that weights each factor by its mean daily IC against `returns`.
    pub fn from_returns(ctx: &EvalContext, returns: ReturnSeries) -> Self {
        Self {
            ctx: ctx.clone(),
            source: WeightSource::MeanIc(returns),
        }
    }

    /// Weight source in use.
    pub const fn source(&self) -> &WeightSource {
        &self.source
    }

    fn weights_for(&self, standardized: &[FactorSeries]) -> Result<WeightVector> {
        match &self.source {
            WeightSource::Fixed(weights) => Ok(weights.clone()),
            WeightSource::MeanIc(returns) => {
                let engine = IcEngine::new(&self.ctx);
                let method = self.ctx.config().ic_method;
                let mut pairs = Vec::with_capacity(standardized.len());
                for factor in standardized {
                    let daily = engine.compute_daily_ic(factor, returns);
                    let agg = engine.aggregate(&daily.stats, method)?;
                    tracing::debug!(factor = factor.name(), mean_ic = agg.mean_ic, "IC weight");
                    pairs.push((factor.name(), agg.mean_ic));
                }
                WeightVector::new(pairs)
            }
        }
    }
}

impl Combiner for IcWeightedCombiner {
    fn combine(&self, factors: &[FactorSeries]) -> Result<Combination> {
        let _span = self.ctx.enter("ic_weighted");
        let axis = self.ctx.config().normalization.axis;
        let normalizer = Normalizer::new(&self.ctx);
        let mut diagnostics = Diagnostics::new();

        let standardized: Vec<FactorSeries> = factors
            .iter()
            .map(|f| {
                let n = normalizer.normalize(f, axis, NormalizeMethod::Standardize);
                diagnostics.merge(n.diagnostics);
                n.series
            })
            .collect();

        let weights = self.weights_for(&standardized)?;
        let composite = combine_weighted(&standardized, &weights, self.name())?;
        Ok(Combination {
            composite,
            weights,
            diagnostics,
        })
    }

    fn name(&self) -> &str {
        "ic_weighted"
    }
}
