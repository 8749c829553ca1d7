//! Factor weights.

use std::collections::BTreeMap;

use ronda_eval::AggregateStat;
use ronda_traits::{Result, RondaError};
use serde::{Deserialize, Serialize};

/// Mapping from factor name to weight, fixed once built.
///
/// Weights may be negative (regression and linear-model weights keep their
/// sign). Equal and rank-sum weights are non-negative and sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    weights: BTreeMap<String, f64>,
}

impl WeightVector {
    /// Build from `(name, weight)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidData`] for a non-finite weight or a
    /// repeated name.
    pub fn new<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Result<Self> {
        let mut weights = BTreeMap::new();
        for (name, w) in pairs {
            let name = name.into();
            if !w.is_finite() {
                return Err(RondaError::InvalidData(format!("weight for {name} is {w}")));
            }
            if weights.insert(name.clone(), w).is_some() {
                return Err(RondaError::InvalidData(format!("duplicate weight for {name}")));
            }
        }
        Ok(Self { weights })
    }

    /// `1 / k` for each of `k` names.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidData`] for a repeated name.
    pub fn equal<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let w = 1.0 / names.len().max(1) as f64;
        Self::new(names.iter().map(|n| (n.as_ref(), w)))
    }

    /// Each factor weighted by its mean IC, sign included.
    pub fn from_ic_stats<'a>(stats: impl IntoIterator<Item = (&'a str, &'a AggregateStat)>) -> Self {
        Self {
            weights: stats
                .into_iter()
                .map(|(name, s)| (name.to_string(), s.mean_ic))
                .collect(),
        }
    }

    /// Exponentially decayed mean of each factor's most recent ICs.
    ///
    /// Only the last `lookback` values count. The newest value has weight 1
    /// and one that is `age` periods older has weight `exp(-decay * age)`;
    /// `decay = 0` is a plain mean. A factor with no finite history gets 0.
    pub fn from_ic_history(history: &BTreeMap<String, Vec<f64>>, lookback: usize, decay: f64) -> Self {
        let weights = history
            .iter()
            .map(|(name, ics)| {
                let recent: Vec<f64> = ics
                    .iter()
                    .copied()
                    .filter(|v| v.is_finite())
                    .collect();
                let recent = &recent[recent.len().saturating_sub(lookback)..];
                (name.clone(), decayed_mean(recent, decay))
            })
            .collect();
        Self { weights }
    }

    /// Weight of `name`.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.weights.get(name).copied()
    }

    /// Number of factors.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// True when no factor has a weight.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// `(name, weight)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    /// True when every weight is in `[0, 1]` and they sum to 1 within 1e-9.
    pub fn is_convex(&self) -> bool {
        !self.is_empty()
            && self.weights.values().all(|w| (0.0..=1.0).contains(w))
            && (self.sum() - 1.0).abs() <= 1e-9
    }

    /// Copy scaled so the absolute weights sum to 1; unchanged when all are zero.
    pub fn normalized_abs(&self) -> Self {
        let total: f64 = self.weights.values().map(|w| w.abs()).sum();
        if total < 1e-10 {
            return self.clone();
        }
        Self {
            weights: self
                .weights
                .iter()
                .map(|(k, w)| (k.clone(), w / total))
                .collect(),
        }
    }
}

fn decayed_mean(history: &[f64], decay: f64) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let mut total_weight = 0.0;
    let mut weighted_sum = 0.0;
    for (i, &ic) in history.iter().enumerate() {
        let age = (history.len() - 1 - i) as f64;
        let weight = (-decay * age).exp();
        weighted_sum += ic * weight;
        total_weight += weight;
    }
    if total_weight > 1e-10 {
        weighted_sum / total_weight
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_equal_weights() {
        let w = WeightVector::equal(&["a", "b", "c"]).unwrap();
        assert_eq!(w.len(), 3);
        assert!(w.is_convex());
        assert_abs_diff_eq!(w.get("b").unwrap(), 1.0 / 3.0);
    }

    #[test]
    fn test_equal_rejects_repeated_name() {
        let err = WeightVector::equal(&["a", "b", "a"]).unwrap_err();
        assert!(matches!(err, RondaError::InvalidData(_)));
    }

    #[test]
    fn test_rejects_bad_weights() {
        assert!(WeightVector::new([("a", f64::NAN)]).is_err());
        assert!(WeightVector::new([("a", 1.0), ("a", 2.0)]).is_err());
        let w = WeightVector::new([("a", -0.5), ("b", 1.5)]).unwrap();
        assert!(!w.is_convex());
        assert_abs_diff_eq!(w.normalized_abs().get("a").unwrap(), -0.25);
    }

    #[test]
    fn test_history_lookback() {
        let mut history = BTreeMap::new();
        history.insert("a".to_string(), vec![1.0, 1.0, 1.0, 0.05, 0.05]);
        history.insert("b".to_string(), vec![]);
        let w = WeightVector::from_ic_history(&history, 2, 0.0);
        assert_abs_diff_eq!(w.get("a").unwrap(), 0.05, epsilon = 1e-12);
        assert_eq!(w.get("b"), Some(0.0));
    }

    #[test]
    fn test_history_decay_favors_recent() {
        let mut history = BTreeMap::new();
        history.insert("a".to_string(), (0..10).map(|i| 0.05 + f64::from(i) * 0.01).collect());
        let flat = WeightVector::from_ic_history(&history, 10, 0.0).get("a").unwrap();
        let decayed = WeightVector::from_ic_history(&history, 10, 0.5).get("a").unwrap();
        assert_abs_diff_eq!(flat, 0.095, epsilon = 1e-12);
        assert!(decayed > flat);
    }

    #[test]
    fn test_from_ic_stats_keeps_sign() {
        let pos = AggregateStat::from_values(&[0.04, 0.06]).unwrap();
        let neg = AggregateStat::from_values(&[-0.02, -0.04]).unwrap();
        let w = WeightVector::from_ic_stats([("mom", &pos), ("rev", &neg)]);
        assert_abs_diff_eq!(w.get("mom").unwrap(), 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(w.get("rev").unwrap(), -0.03, epsilon = 1e-12);
    }
}
