#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types for the ronda factor evaluation engine.
//!
//! This crate holds what every other ronda crate shares: keyed factor and
//! return series, the error taxonomy, skip diagnostics, run configuration
//! and context, statistics, normalization, least squares and panel alignment.

/// The version of the ronda-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod linalg;
pub mod normalize;
pub mod panel;
pub mod returns;
pub mod series;
pub mod stats;
pub mod types;

pub use config::{
    Axis, CombinationMode, EvalConfig, IcMethod, ModelKind, NormalizationConfig, NormalizeMethod,
    OptimizerConfig, ReturnAnchor, StabilityConfig,
};
pub use context::EvalContext;
pub use diagnostics::{Diagnostics, Skip, SkipKey, SkipReason};
pub use error::{Result, RondaError};
pub use grid::{HyperparamGrid, Hyperparams};
pub use normalize::{Normalized, Normalizer};
pub use panel::Panel;
pub use returns::ReturnSeries;
pub use series::{FactorSeries, Key};
pub use types::{Date, InstrumentId, MarketData, Observation, PriceBar, PriceHistory};
