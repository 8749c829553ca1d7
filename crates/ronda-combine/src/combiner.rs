//! Core trait definition for factor combiners.

use std::collections::BTreeMap;

use ronda_traits::{Diagnostics, FactorSeries, Result, RondaError};

use crate::weights::WeightVector;

/// A composite factor and the weights that produced it.
#[derive(Debug, Clone)]
pub struct Combination {
    /// Composite series, keyed by the intersection of the inputs' keys.
    pub composite: FactorSeries,
    /// Weight applied to each input factor.
    pub weights: WeightVector,
    /// Groups or dates skipped while preparing the inputs.
    pub diagnostics: Diagnostics,
}

/// Combines multiple factor series into a composite.
///
/// Implementors define different strategies for weighting and combining factors.
/// All implementations must be thread-safe (Send + Sync) to support parallel processing.
///
/// # Examples
///
/// ```rust,no_run
/// use ronda_combine::{Combination, Combiner, WeightVector, combine_weighted};
/// use ronda_traits::{Diagnostics, FactorSeries};
///
/// struct FirstOnly;
///
/// impl Combiner for FirstOnly {
///     fn combine(&self, factors: &[FactorSeries]) -> ronda_traits::Result<Combination> {
///         let names: Vec<&str> = factors.iter().map(|f| f.name()).collect();
///         let weights = WeightVector::new(
///             names.iter().enumerate().map(|(i, n)| (*n, if i == 0 { 1.0 } else { 0.0 })),
///         )?;
///         let composite = combine_weighted(factors, &weights, "first_only")?;
///         Ok(Combination { composite, weights, diagnostics: Diagnostics::new() })
///     }
///
///     fn name(&self) -> &str {
///         "first_only"
///     }
/// }
/// ```
pub trait Combiner: Send + Sync {
    /// Combine factors into a composite series.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - no factors are provided
    /// - the factors share no `(instrument, date)` key
    /// - a strategy-specific step fails (for example a singular regression)
    fn combine(&self, factors: &[FactorSeries]) -> Result<Combination>;

    /// Name of this combination strategy.
    ///
    /// Used for logging and as the composite series name.
    fn name(&self) -> &str;
}

/// Weighted sum of `factors` over the keys they all share.
///
/// Each factor's weight is looked up by its name in `weights` and used as
/// given, without renormalization.
///
/// # Errors
///
/// - [`RondaError::InvalidData`] when `factors` is empty or a factor has no weight
/// - [`RondaError::KeyMismatch`] when the key intersection is empty
pub fn combine_weighted(
    factors: &[FactorSeries],
    weights: &WeightVector,
    name: &str,
) -> Result<FactorSeries> {
    if factors.is_empty() {
        return Err(RondaError::InvalidData("cannot combine zero factors".into()));
    }
    let ws = factors
        .iter()
        .map(|f| {
            weights
                .get(f.name())
                .ok_or_else(|| RondaError::InvalidData(format!("no weight for factor {}", f.name())))
        })
        .collect::<Result<Vec<f64>>>()?;

    let refs: Vec<&FactorSeries> = factors.iter().collect();
    let common = FactorSeries::intersect_keys(&refs);
    if common.is_empty() {
        let names: Vec<&str> = factors.iter().map(|f| f.name()).collect();
        return Err(RondaError::KeyMismatch(names.join(", ")));
    }

    let mut out = BTreeMap::new();
    for key in common {
        let value: f64 = factors
            .iter()
            .zip(&ws)
            .map(|(f, w)| w * f.values().get(&key).copied().unwrap_or(0.0))
            .sum();
        out.insert(key, value);
    }

    let composite = FactorSeries::from_map(name, out);
    if composite.is_empty() {
        return Err(RondaError::InvalidData("combination produced non-finite values".into()));
    }
    Ok(composite)
}
