//! Common types used throughout ronda.
//!
//! This module defines instrument identifiers, observations, price bars and
//! the polars-backed [`MarketData`] container handed over by data loaders.

use derive_more::{Display, From};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RondaError};

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
///
/// Polars stores `Date` columns as days since the Unix epoch.
pub const CE_TO_UNIX_EPOCH_DAYS: i32 = 719_163;

/// Converts a polars physical date value into a [`Date`].
pub fn date_from_epoch_days(days: i32) -> Option<Date> {
    Date::from_num_days_from_ce_opt(days + CE_TO_UNIX_EPOCH_DAYS)
}

/// A tradable instrument identifier, typically a ticker like "AAPL".
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Serialize, Deserialize,
)]
pub struct InstrumentId(pub String);

impl InstrumentId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InstrumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single keyed value: a factor reading or a realized return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Instrument the value belongs to.
    pub instrument: InstrumentId,
    /// Date the value is assigned to.
    pub date: Date,
    /// The value itself.
    pub value: f64,
}

impl Observation {
    /// Create a new observation.
    pub fn new(instrument: impl Into<InstrumentId>, date: Date, value: f64) -> Self {
        Self {
            instrument: instrument.into(),
            date,
            value,
        }
    }
}

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading date.
    pub date: Date,
    /// Opening price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
}

impl PriceBar {
    /// Whether every price is finite and strictly positive and volume is finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0)
            && self.volume.is_finite()
            && self.volume >= 0.0
    }
}

/// Price history of one instrument, ascending by date with unique dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    /// Instrument the bars belong to.
    pub instrument: InstrumentId,
    /// Bars sorted ascending by date.
    pub bars: Vec<PriceBar>,
}

impl PriceHistory {
    /// Create a history, sorting bars by date and keeping the first bar seen for each date.
    pub fn new(instrument: impl Into<InstrumentId>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self {
            instrument: instrument.into(),
            bars,
        }
    }

    /// Number of bars.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Whether the history has no bars.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Dates of all bars, ascending.
    pub fn dates(&self) -> Vec<Date> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// Closing prices, ascending by date.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

/// Container for market data.
///
/// `MarketData` wraps a long-format Polars DataFrame with one row per
/// instrument and date.
///
/// # Expected Schema
///
/// - `instrument`: instrument identifier (string)
/// - `date`: trading date (`Date`)
/// - `open`, `high`, `low`, `close`: prices (`f64`)
/// - `volume`: traded volume (`f64`)
#[derive(Debug, Clone)]
pub struct MarketData {
    data: DataFrame,
}

impl MarketData {
    /// Columns required by [`MarketData::histories`].
    pub const REQUIRED_COLUMNS: [&'static str; 7] =
        ["instrument", "date", "open", "high", "low", "close", "volume"];

    /// Creates a new `MarketData` instance from a DataFrame.
    pub const fn new(data: DataFrame) -> Self {
        Self { data }
    }

    /// Returns a reference to the underlying DataFrame.
    pub const fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Returns the number of rows in the market data.
    pub fn len(&self) -> usize {
        self.data.height()
    }

    /// Returns whether the market data is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks if a column exists in the market data.
    pub fn has_column(&self, name: &str) -> bool {
        self.data
            .get_column_names()
            .iter()
            .any(|s| s.as_str() == name)
    }

    /// Builds a long-format frame from per-instrument histories.
    pub fn from_histories(histories: &[PriceHistory]) -> Result<Self> {
        let rows: usize = histories.iter().map(PriceHistory::len).sum();
        let mut instrument = Vec::with_capacity(rows);
        let mut date = Vec::with_capacity(rows);
        let mut open = Vec::with_capacity(rows);
        let mut high = Vec::with_capacity(rows);
        let mut low = Vec::with_capacity(rows);
        let mut close = Vec::with_capacity(rows);
        let mut volume = Vec::with_capacity(rows);

        for history in histories {
            for bar in &history.bars {
                instrument.push(history.instrument.as_str().to_string());
                date.push(bar.date);
                open.push(bar.open);
                high.push(bar.high);
                low.push(bar.low);
                close.push(bar.close);
                volume.push(bar.volume);
            }
        }

        let df = DataFrame::new(vec![
            Column::new("instrument".into(), instrument),
            Column::new("date".into(), date),
            Column::new("open".into(), open),
            Column::new("high".into(), high),
            Column::new("low".into(), low),
            Column::new("close".into(), close),
            Column::new("volume".into(), volume),
        ])?;

        Ok(Self::new(df))
    }

    /// Splits the frame into one [`PriceHistory`] per instrument, sorted by instrument.
    ///
    /// Rows with a null in any required column are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::MissingColumn`] when a required column is absent.
    pub fn histories(&self) -> Result<Vec<PriceHistory>> {
        for col in Self::REQUIRED_COLUMNS {
            if !self.has_column(col) {
                return Err(RondaError::MissingColumn(col.to_string()));
            }
        }

        let df = &self.data;
        let instruments = df.column("instrument")?.as_materialized_series().str()?;
        let dates = df.column("date")?.as_materialized_series().date()?;
        let price = |name: &str| -> Result<Vec<Option<f64>>> {
            let series = df.column(name)?.as_materialized_series().cast(&DataType::Float64)?;
            Ok(series.f64()?.into_iter().collect())
        };
        let open = price("open")?;
        let high = price("high")?;
        let low = price("low")?;
        let close = price("close")?;
        let volume = price("volume")?;

        let mut grouped: std::collections::BTreeMap<String, Vec<PriceBar>> = Default::default();
        for (i, (inst, day)) in instruments.into_iter().zip(dates.into_iter()).enumerate() {
            let (Some(inst), Some(day)) = (inst, day) else {
                continue;
            };
            let Some(date) = date_from_epoch_days(day) else {
                continue;
            };
            let (Some(o), Some(h), Some(l), Some(c), Some(v)) =
                (open[i], high[i], low[i], close[i], volume[i])
            else {
                continue;
            };
            grouped.entry(inst.to_string()).or_default().push(PriceBar {
                date,
                open: o,
                high: h,
                low: l,
                close: c,
                volume: v,
            });
        }

        Ok(grouped
            .into_iter()
            .map(|(inst, bars)| PriceHistory::new(inst, bars))
            .collect())
    }
}

impl From<DataFrame> for MarketData {
    fn from(data: DataFrame) -> Self {
        Self::new(data)
    }
}

impl AsRef<DataFrame> for MarketData {
    fn as_ref(&self) -> &DataFrame {
        &self.data
    }
}
