//! Error types for the ronda engine.
//!
//! Per-date and per-group failures are not errors: they are recorded as skips
//! in [`Diagnostics`](crate::Diagnostics) and the call succeeds with whatever
//! was computable. The variants here are the failures a caller must see.

use thiserror::Error;

use crate::types::Date;

/// The main error type for ronda operations.
#[derive(Debug, Error)]
pub enum RondaError {
    /// A group or date has too few observations for the requested statistic.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Zero variance in factor or return values.
    #[error("Degenerate distribution: {0}")]
    DegenerateDistribution(String),

    /// A set of series being combined has no overlapping instrument/date keys.
    #[error("No overlapping keys: {0}")]
    KeyMismatch(String),

    /// A ratio whose denominator is zero (for example IR with std_ic = 0).
    #[error("Undefined ratio: {0}")]
    UndefinedRatio(String),

    /// Error due to invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error when a required column is missing from the data.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A configuration value that cannot be honored.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A forward return dated after the evaluation cutoff.
    #[error("Return dated {date} is after the evaluation cutoff {cutoff}")]
    LookAhead {
        /// Date of the offending return.
        date: Date,
        /// Evaluation cutoff.
        cutoff: Date,
    },

    /// Nothing survived filtering and skipping.
    #[error("No usable data: {0}")]
    NoUsableData(String),

    /// Error when a factor name is not registered.
    #[error("Factor not found: {0}")]
    FactorNotFound(String),

    /// Model fitting failed (singular system, empty training fold, ...).
    #[error("Model error: {0}")]
    Model(String),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Error parsing or writing JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl From<String> for RondaError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for RondaError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// A specialized Result type for ronda operations.
pub type Result<T> = std::result::Result<T, RondaError>;
