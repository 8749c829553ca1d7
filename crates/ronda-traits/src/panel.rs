//! Factor matrices aligned on shared keys.

use std::collections::BTreeSet;

use ndarray::{Array1, Array2, Axis};

use crate::error::{Result, RondaError};
use crate::series::{FactorSeries, Key};
use crate::types::Date;

/// Several factors (and optionally a target) aligned on the intersection of their keys.
///
/// Rows are ordered by date, then instrument, so contiguous row ranges are
/// contiguous periods of time.
#[derive(Debug, Clone)]
pub struct Panel {
    names: Vec<String>,
    keys: Vec<Key>,
    x: Array2<f64>,
    y: Option<Array1<f64>>,
}

impl Panel {
    /// Align `factors` and optionally `target` on their common keys.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidData`] when no factors are given and
    /// [`RondaError::KeyMismatch`] when the inputs share no key.
    pub fn new(factors: &[FactorSeries], target: Option<&FactorSeries>) -> Result<Self> {
        if factors.is_empty() {
            return Err(RondaError::InvalidData("panel needs at least one factor".into()));
        }
        let mut all: Vec<&FactorSeries> = factors.iter().collect();
        if let Some(t) = target {
            all.push(t);
        }
        let common = FactorSeries::intersect_keys(&all);
        if common.is_empty() {
            let names: Vec<&str> = all.iter().map(|s| s.name()).collect();
            return Err(RondaError::KeyMismatch(names.join(", ")));
        }

        let mut keys: Vec<Key> = common.into_iter().collect();
        keys.sort_by(|a, b| (a.1, &a.0).cmp(&(b.1, &b.0)));

        let mut x = Array2::zeros((keys.len(), factors.len()));
        for (j, factor) in factors.iter().enumerate() {
            let values = factor.values();
            for (i, key) in keys.iter().enumerate() {
                x[[i, j]] = values.get(key).copied().unwrap_or(f64::NAN);
            }
        }
        let y = target.map(|t| {
            let values = t.values();
            keys.iter()
                .map(|k| values.get(k).copied().unwrap_or(f64::NAN))
                .collect()
        });

        Ok(Self {
            names: factors.iter().map(|f| f.name().to_string()).collect(),
            keys,
            x,
            y,
        })
    }

    /// Factor names, one per column.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Row keys in (date, instrument) order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Feature matrix, rows aligned with [`Panel::keys`].
    pub const fn features(&self) -> &Array2<f64> {
        &self.x
    }

    /// Target vector.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidData`] when the panel was built without a target.
    pub fn target(&self) -> Result<&Array1<f64>> {
        self.y
            .as_ref()
            .ok_or_else(|| RondaError::InvalidData("panel has no target".into()))
    }

    /// Distinct dates, ascending.
    pub fn dates(&self) -> Vec<Date> {
        let set: BTreeSet<Date> = self.keys.iter().map(|k| k.1).collect();
        set.into_iter().collect()
    }

    /// Row indices whose date is in `dates`.
    pub fn rows_for(&self, dates: &BTreeSet<Date>) -> Vec<usize> {
        self.keys
            .iter()
            .enumerate()
            .filter(|(_, k)| dates.contains(&k.1))
            .map(|(i, _)| i)
            .collect()
    }

    /// Feature rows and target values for the given row indices.
    pub fn select(&self, rows: &[usize]) -> Result<(Array2<f64>, Array1<f64>)> {
        let y = self.target()?;
        Ok((self.x.select(Axis(0), rows), y.select(Axis(0), rows)))
    }
}
