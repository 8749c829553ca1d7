//! Hyperparameter grids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One point of a hyperparameter grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hyperparams(pub BTreeMap<String, f64>);

impl Hyperparams {
    /// Value of `name`, or `default` when unset.
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.0.get(name).copied().unwrap_or(default)
    }

    /// Integer value of `name` (rounded, at least `min`), or `default` when unset.
    pub fn usize_or(&self, name: &str, default: usize, min: usize) -> usize {
        self.0
            .get(name)
            .filter(|v| v.is_finite() && **v >= 0.0)
            .map_or(default, |v| v.round() as usize)
            .max(min)
    }

    /// Set one value, returning the updated point.
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }
}

/// Candidate values per hyperparameter name.
///
/// Expansion is the cartesian product in name order, with the last name
/// varying fastest. An empty grid expands to a single empty point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperparamGrid(pub BTreeMap<String, Vec<f64>>);

impl HyperparamGrid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add candidate values for one hyperparameter.
    pub fn with(mut self, name: &str, values: Vec<f64>) -> Self {
        self.0.insert(name.to_string(), values);
        self
    }

    /// Number of points in the expansion.
    pub fn size(&self) -> usize {
        self.0.values().filter(|v| !v.is_empty()).map(Vec::len).product()
    }

    /// Every combination, in deterministic order.
    pub fn expand(&self) -> Vec<Hyperparams> {
        let mut points = vec![Hyperparams::default()];
        for (name, values) in &self.0 {
            if values.is_empty() {
                continue;
            }
            points = points
                .into_iter()
                .flat_map(|p| values.iter().map(move |v| p.clone().with(name, *v)))
                .collect();
        }
        points
    }
}
