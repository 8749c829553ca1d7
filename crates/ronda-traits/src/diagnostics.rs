//! Skip accounting for recoverable per-unit failures.
//!
//! A date with too few observations or a constant cross-section is not an
//! error. It is recorded here and excluded from the statistic.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Date, InstrumentId};

/// Why a unit was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Fewer observations than the statistic needs.
    InsufficientData,
    /// Zero variance in factor or return values.
    DegenerateDistribution,
    /// Fewer observations than quantile buckets.
    InsufficientCrossSection,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InsufficientData => "insufficient_data",
            Self::DegenerateDistribution => "degenerate_distribution",
            Self::InsufficientCrossSection => "insufficient_cross_section",
        };
        f.write_str(s)
    }
}

/// The unit that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKey {
    /// A date's cross-section (or a window ending on that date).
    Date(Date),
    /// An instrument's time series.
    Instrument(InstrumentId),
}

impl fmt::Display for SkipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{d}"),
            Self::Instrument(i) => write!(f, "{i}"),
        }
    }
}

/// One skipped unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skip {
    /// Which stage recorded the skip (`ic`, `quantile`, `normalize`, ...).
    pub stage: String,
    /// The skipped unit.
    pub key: SkipKey,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Skips recorded during a call, returned next to the successful result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    skips: Vec<Skip>,
}

impl Diagnostics {
    /// Create an empty record.
    pub const fn new() -> Self {
        Self { skips: Vec::new() }
    }

    /// Record a skip and emit a debug event for it.
    pub fn skip(&mut self, stage: &str, key: SkipKey, reason: SkipReason) {
        match reason {
            SkipReason::DegenerateDistribution => {
                tracing::debug!(stage, %key, "skipped: zero variance");
            }
            _ => tracing::debug!(stage, %key, %reason, "skipped"),
        }
        self.skips.push(Skip {
            stage: stage.to_string(),
            key,
            reason,
        });
    }

    /// All recorded skips in recording order.
    pub fn skips(&self) -> &[Skip] {
        &self.skips
    }

    /// Total number of skips.
    pub fn len(&self) -> usize {
        self.skips.len()
    }

    /// Whether nothing was skipped.
    pub fn is_empty(&self) -> bool {
        self.skips.is_empty()
    }

    /// Number of skips with the given reason.
    pub fn count(&self, reason: SkipReason) -> usize {
        self.skips.iter().filter(|s| s.reason == reason).count()
    }

    /// Number of skips recorded by a stage.
    pub fn count_stage(&self, stage: &str) -> usize {
        self.skips.iter().filter(|s| s.stage == stage).count()
    }

    /// Skip counts per reason.
    pub fn counts(&self) -> BTreeMap<SkipReason, usize> {
        let mut out = BTreeMap::new();
        for skip in &self.skips {
            *out.entry(skip.reason).or_insert(0) += 1;
        }
        out
    }

    /// Append another record.
    pub fn merge(&mut self, other: Self) {
        self.skips.extend(other.skips);
    }

    /// Emit a warning summarizing the skips of `stage`, if any.
    pub fn log_summary(&self, stage: &str) {
        let stage_skips: Vec<&Skip> = self.skips.iter().filter(|s| s.stage == stage).collect();
        if stage_skips.is_empty() {
            return;
        }
        let degenerate = stage_skips
            .iter()
            .filter(|s| s.reason == SkipReason::DegenerateDistribution)
            .count();
        tracing::warn!(
            stage,
            skipped = stage_skips.len(),
            degenerate,
            insufficient = stage_skips.len() - degenerate,
            "units skipped"
        );
    }
}
