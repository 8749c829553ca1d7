//! Keyed factor series.
//!
//! A [`FactorSeries`] maps `(instrument, date)` to a finite value. Missing
//! entries are simply absent; non-finite inputs are treated as missing.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RondaError};
use crate::types::{Date, InstrumentId, Observation, date_from_epoch_days};

/// Key of one observation.
pub type Key = (InstrumentId, Date);

/// A named mapping from `(instrument, date)` to a finite value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorSeries {
    name: String,
    values: BTreeMap<Key, f64>,
}

impl FactorSeries {
    /// Create an empty series.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    /// Build a series from observations.
    ///
    /// Non-finite values are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidData`] if two observations share a key.
    pub fn from_observations(
        name: impl Into<String>,
        observations: impl IntoIterator<Item = Observation>,
    ) -> Result<Self> {
        let name = name.into();
        let mut values = BTreeMap::new();
        for obs in observations {
            let key = (obs.instrument, obs.date);
            if values.contains_key(&key) {
                return Err(RondaError::InvalidData(format!(
                    "duplicate observation for {} on {} in '{}'",
                    key.0, key.1, name
                )));
            }
            if obs.value.is_finite() {
                values.insert(key, obs.value);
            } else {
                // keep the key reserved so a later duplicate is still caught
                values.insert(key, f64::NAN);
            }
        }
        values.retain(|_, v| v.is_finite());
        Ok(Self { name, values })
    }

    /// Build a series from an already-keyed map, dropping non-finite values.
    pub fn from_map(name: impl Into<String>, mut values: BTreeMap<Key, f64>) -> Self {
        values.retain(|_, v| v.is_finite());
        Self {
            name: name.into(),
            values,
        }
    }

    /// Series name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return a copy carrying a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: self.values.clone(),
        }
    }

    /// Insert or replace one value. Non-finite values remove the key instead.
    pub fn insert(&mut self, instrument: InstrumentId, date: Date, value: f64) {
        if value.is_finite() {
            self.values.insert((instrument, date), value);
        } else {
            self.values.remove(&(instrument, date));
        }
    }

    /// Look up one value.
    pub fn get(&self, instrument: &InstrumentId, date: Date) -> Option<f64> {
        self.values.get(&(instrument.clone(), date)).copied()
    }

    /// Number of stored observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no observations.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(key, value)` pairs ordered by instrument then date.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, f64)> + '_ {
        self.values.iter().map(|(k, v)| (k, *v))
    }

    /// Underlying map.
    pub const fn values(&self) -> &BTreeMap<Key, f64> {
        &self.values
    }

    /// Set of keys.
    pub fn keys(&self) -> BTreeSet<Key> {
        self.values.keys().cloned().collect()
    }

    /// Distinct dates, ascending.
    pub fn dates(&self) -> Vec<Date> {
        let set: BTreeSet<Date> = self.values.keys().map(|(_, d)| *d).collect();
        set.into_iter().collect()
    }

    /// Distinct instruments, ascending.
    pub fn instruments(&self) -> Vec<InstrumentId> {
        let set: BTreeSet<&InstrumentId> = self.values.keys().map(|(i, _)| i).collect();
        set.into_iter().cloned().collect()
    }

    /// Cross-sections keyed by date. Each section is ordered by instrument.
    pub fn cross_sections(&self) -> BTreeMap<Date, Vec<(InstrumentId, f64)>> {
        let mut out: BTreeMap<Date, Vec<(InstrumentId, f64)>> = BTreeMap::new();
        for ((inst, date), v) in &self.values {
            out.entry(*date).or_default().push((inst.clone(), *v));
        }
        out
    }

    /// Per-instrument histories. Each history is ordered by date.
    pub fn by_instrument(&self) -> BTreeMap<InstrumentId, Vec<(Date, f64)>> {
        let mut out: BTreeMap<InstrumentId, Vec<(Date, f64)>> = BTreeMap::new();
        for ((inst, date), v) in &self.values {
            out.entry(inst.clone()).or_default().push((*date, *v));
        }
        out
    }

    /// Restrict to dates in `[start, end]`; `None` leaves that side open.
    pub fn restrict_range(&self, start: Option<Date>, end: Option<Date>) -> Self {
        let values = self
            .values
            .iter()
            .filter(|((_, d), _)| start.is_none_or(|s| *d >= s) && end.is_none_or(|e| *d <= e))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        Self {
            name: self.name.clone(),
            values,
        }
    }

    /// Restrict to the given keys.
    pub fn restrict_keys(&self, keys: &BTreeSet<Key>) -> Self {
        let values = self
            .values
            .iter()
            .filter(|(k, _)| keys.contains(*k))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        Self {
            name: self.name.clone(),
            values,
        }
    }

    /// Keys present in every series. Empty input yields an empty set.
    pub fn intersect_keys(series: &[&Self]) -> BTreeSet<Key> {
        let Some((first, rest)) = series.split_first() else {
            return BTreeSet::new();
        };
        first
            .values
            .keys()
            .filter(|k| rest.iter().all(|s| s.values.contains_key(*k)))
            .cloned()
            .collect()
    }

    /// Inner join with another series on shared keys, grouped by date.
    ///
    /// Each date holds `(instrument, self value, other value)` ordered by instrument.
    pub fn join_by_date(&self, other: &Self) -> BTreeMap<Date, Vec<(InstrumentId, f64, f64)>> {
        let mut out: BTreeMap<Date, Vec<(InstrumentId, f64, f64)>> = BTreeMap::new();
        for ((inst, date), x) in &self.values {
            if let Some(y) = other.values.get(&(inst.clone(), *date)) {
                out.entry(*date).or_default().push((inst.clone(), *x, *y));
            }
        }
        out
    }

    /// Build a series from a long frame with `instrument`, `date` and `value` columns.
    pub fn from_frame(name: impl Into<String>, df: &DataFrame) -> Result<Self> {
        for col in ["instrument", "date", "value"] {
            if !df.get_column_names().iter().any(|c| c.as_str() == col) {
                return Err(RondaError::MissingColumn(col.to_string()));
            }
        }
        let instruments = df.column("instrument")?.as_materialized_series().str()?;
        let dates = df.column("date")?.as_materialized_series().date()?;
        let values = df
            .column("value")?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let values = values.f64()?;

        let mut observations = Vec::with_capacity(df.height());
        for ((inst, day), value) in instruments
            .into_iter()
            .zip(dates.into_iter())
            .zip(values.into_iter())
        {
            let (Some(inst), Some(day), Some(value)) = (inst, day, value) else {
                continue;
            };
            let date = date_from_epoch_days(day)
                .ok_or_else(|| RondaError::InvalidData(format!("date out of range: {day}")))?;
            observations.push(Observation::new(inst, date, value));
        }
        Self::from_observations(name, observations)
    }

    /// Convert to a long frame with `instrument`, `date` and `value` columns.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut instruments = Vec::with_capacity(self.len());
        let mut dates = Vec::with_capacity(self.len());
        let mut values = Vec::with_capacity(self.len());
        for ((inst, date), v) in &self.values {
            instruments.push(inst.as_str().to_string());
            dates.push(*date);
            values.push(*v);
        }
        Ok(DataFrame::new(vec![
            Column::new("instrument".into(), instruments),
            Column::new("date".into(), dates),
            Column::new("value".into(), values),
        ])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> Date {
        Date::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample() -> FactorSeries {
        FactorSeries::from_observations(
            "mom",
            vec![
                Observation::new("B", d(1), 2.0),
                Observation::new("A", d(1), 1.0),
                Observation::new("A", d(2), 3.0),
                Observation::new("C", d(2), f64::NAN),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_non_finite_dropped() {
        let s = sample();
        assert_eq!(s.len(), 3);
        assert_eq!(s.get(&"C".into(), d(2)), None);
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let err = FactorSeries::from_observations(
            "dup",
            vec![Observation::new("A", d(1), 1.0), Observation::new("A", d(1), f64::NAN)],
        )
        .unwrap_err();
        assert!(matches!(err, RondaError::InvalidData(_)));
    }

    #[test]
    fn test_cross_sections_ordered_by_instrument() {
        let sections = sample().cross_sections();
        let day1: Vec<_> = sections[&d(1)].iter().map(|(i, _)| i.as_str().to_string()).collect();
        assert_eq!(day1, vec!["A", "B"]);
        assert_eq!(sections[&d(2)].len(), 1);
    }

    #[test]
    fn test_restrict_range() {
        let s = sample().restrict_range(Some(d(2)), None);
        assert_eq!(s.dates(), vec![d(2)]);
        let s = sample().restrict_range(None, Some(d(1)));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_intersect_and_join() {
        let a = sample();
        let b = FactorSeries::from_observations(
            "ret",
            vec![Observation::new("A", d(1), 0.1), Observation::new("B", d(2), 0.2)],
        )
        .unwrap();
        let keys = FactorSeries::intersect_keys(&[&a, &b]);
        assert_eq!(keys.len(), 1);

        let joined = a.join_by_date(&b);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[&d(1)], vec![(InstrumentId::from("A"), 1.0, 0.1)]);
    }

    #[test]
    fn test_frame_round_trip() {
        let s = sample();
        let df = s.to_frame().unwrap();
        assert_eq!(df.height(), 3);
        let back = FactorSeries::from_frame("mom", &df).unwrap();
        assert_eq!(back, s);
    }
}
