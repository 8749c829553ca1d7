//! Price-based factor definitions and parallel precomputation for ronda.
//!
//! This crate provides:
//! - Formulas: momentum, RSI, volatility, drawdown, moving-average and
//!   Bollinger position, and volume ratio over one instrument's bars
//! - A registry resolving names such as `momentum_20` to definitions
//! - A [`Precomputer`] that runs formulas and forward returns across
//!   instruments on a rayon pool with a deterministic merge
//!
//! # Example
//!
//! ```ignore
//! use ronda_signals::{FactorRegistry, Precomputer};
//!
//! let registry = FactorRegistry::with_defaults();
//! let rsi = registry.get("rsi_14")?;
//! let series = Precomputer::new(&ctx, 8)?.factor_series(&histories, &rsi)?;
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod formulas;
pub mod precompute;
pub mod registry;

pub use precompute::{InstrumentResult, Precomputer, clean_bars};
pub use registry::{FactorCategory, FactorDefinition, FactorParams, FactorRegistry, Formula};
