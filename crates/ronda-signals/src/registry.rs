//! Factor registry for discovering and resolving factor definitions.
//!
//! Definitions are plain data plus a formula function pointer. A name with a
//! numeric suffix such as `momentum_20` resolves to the base definition with
//! its `window` parameter set to the suffix.

use std::collections::BTreeMap;

use ronda_traits::{PriceBar, Result, RondaError};
use serde::{Deserialize, Serialize};

use crate::formulas;

/// Per-instrument formula: one optional value per input bar.
pub type Formula = fn(&[PriceBar], &FactorParams) -> Vec<Option<f64>>;

/// Factor category classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    /// Price momentum and relative strength
    Momentum,
    /// Dispersion and downside risk
    Volatility,
    /// Price relative to its own moving averages and bands
    Technical,
    /// Traded volume
    Volume,
}

impl FactorCategory {
    /// Get a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &str {
        match self {
            Self::Momentum => "Price momentum and relative strength factors",
            Self::Volatility => "Return dispersion and drawdown factors",
            Self::Technical => "Moving-average and band position factors",
            Self::Volume => "Trading activity factors",
        }
    }

    /// All categories in display order.
    pub const fn all() -> [Self; 4] {
        [Self::Momentum, Self::Volatility, Self::Technical, Self::Volume]
    }
}

/// Numeric parameters of a formula.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorParams(pub BTreeMap<String, f64>);

impl FactorParams {
    /// Value of `name`, or `default` when absent.
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.0.get(name).copied().unwrap_or(default)
    }

    /// Set `name` to `value`.
    #[must_use]
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    /// Lookback window in bars, at least 1.
    pub fn window(&self) -> usize {
        let w = self.get_or("window", 1.0);
        if w.is_finite() && w >= 1.0 { w as usize } else { 1 }
    }
}

/// A registered factor.
#[derive(Debug, Clone)]
pub struct FactorDefinition {
    /// Unique identifier, also the name of the computed series.
    pub name: String,
    /// Category classification.
    pub category: FactorCategory,
    /// Human-readable description.
    pub description: &'static str,
    /// Parameters handed to `compute`.
    pub params: FactorParams,
    /// Bars needed before the first value appears.
    pub lookback: usize,
    /// The formula.
    pub compute: Formula,
}

impl FactorDefinition {
    /// Run the formula over one instrument's bars.
    pub fn evaluate(&self, bars: &[PriceBar]) -> Vec<Option<f64>> {
        (self.compute)(bars, &self.params)
    }

    /// Copy with a different window, renamed to `name`.
    ///
    /// The lookback shifts by the change in window.
    fn with_window(&self, name: &str, window: usize) -> Self {
        let extra = self.lookback.saturating_sub(self.params.window());
        Self {
            name: name.to_string(),
            params: self.params.clone().with("window", window as f64),
            lookback: window + extra,
            ..self.clone()
        }
    }
}

/// Name-keyed collection of factor definitions.
#[derive(Debug, Clone, Default)]
pub struct FactorRegistry {
    definitions: BTreeMap<String, FactorDefinition>,
}

impl FactorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in price and volume factors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults: [(&str, FactorCategory, &'static str, usize, usize, Formula); 7] = [
            ("momentum", FactorCategory::Momentum, "Return over the last `window` bars", 20, 1, formulas::momentum),
            ("rsi", FactorCategory::Momentum, "Relative strength index of closes", 14, 1, formulas::rsi),
            ("volatility", FactorCategory::Volatility, "Standard deviation of daily returns", 20, 1, formulas::volatility),
            ("max_drawdown", FactorCategory::Volatility, "Worst drawdown inside the window", 20, 0, formulas::max_drawdown),
            ("ma_deviation", FactorCategory::Technical, "Close relative to its moving average", 20, 0, formulas::ma_deviation),
            (
                "bollinger_position",
                FactorCategory::Technical,
                "Close position between Bollinger bands",
                20,
                0,
                formulas::bollinger_position,
            ),
            ("volume_ratio", FactorCategory::Volume, "Volume relative to its moving average", 20, 0, formulas::volume_ratio),
        ];
        for (name, category, description, window, extra, compute) in defaults {
            registry.definitions.insert(
                name.to_string(),
                FactorDefinition {
                    name: name.to_string(),
                    category,
                    description,
                    params: FactorParams::default().with("window", window as f64),
                    lookback: window + extra,
                    compute,
                },
            );
        }
        registry
    }

    /// Add a definition.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidConfig`] if the name is taken.
    pub fn register(&mut self, definition: FactorDefinition) -> Result<()> {
        if self.definitions.contains_key(&definition.name) {
            return Err(RondaError::InvalidConfig(format!(
                "factor '{}' is already registered",
                definition.name
            )));
        }
        self.definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Resolve a factor name.
    ///
    /// Exact names win; otherwise `base_N` resolves to `base` with `window = N`.
    ///
    /// # Errors
    ///
    /// - [`RondaError::FactorNotFound`] when neither form matches
    /// - [`RondaError::InvalidConfig`] for a zero window
    pub fn get(&self, name: &str) -> Result<FactorDefinition> {
        if let Some(def) = self.definitions.get(name) {
            return Ok(def.clone());
        }
        let parsed = name
            .rsplit_once('_')
            .and_then(|(base, suffix)| Some((self.definitions.get(base)?, suffix.parse::<usize>().ok()?)));
        match parsed {
            Some((_, 0)) => Err(RondaError::InvalidConfig(format!("factor '{name}' has a zero window"))),
            Some((base, window)) => Ok(base.with_window(name, window)),
            None => Err(RondaError::FactorNotFound(name.to_string())),
        }
    }

    /// Whether `name` resolves.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Registered base names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }

    /// Registered definitions, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &FactorDefinition> {
        self.definitions.values()
    }

    /// Definitions in one category, sorted by name.
    pub fn by_category(&self, category: FactorCategory) -> Vec<&FactorDefinition> {
        self.iter().filter(|d| d.category == category).collect()
    }

    /// Categories with at least one definition.
    pub fn categories(&self) -> Vec<FactorCategory> {
        FactorCategory::all()
            .into_iter()
            .filter(|c| self.iter().any(|d| d.category == *c))
            .collect()
    }

    /// Number of registered base definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = FactorRegistry::with_defaults();
        assert_eq!(registry.len(), 7);
        for name in [
            "momentum",
            "volatility",
            "rsi",
            "ma_deviation",
            "volume_ratio",
            "max_drawdown",
            "bollinger_position",
        ] {
            assert!(registry.contains(name), "{name} missing");
        }
        assert_eq!(registry.categories(), FactorCategory::all().to_vec());
    }

    #[test]
    fn test_by_category() {
        let registry = FactorRegistry::with_defaults();
        let momentum: Vec<&str> = registry
            .by_category(FactorCategory::Momentum)
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(momentum, vec!["momentum", "rsi"]);
        assert_eq!(registry.by_category(FactorCategory::Volume).len(), 1);
    }

    #[test]
    fn test_parametrized_name() {
        let registry = FactorRegistry::with_defaults();
        let def = registry.get("momentum_5").unwrap();
        assert_eq!(def.name, "momentum_5");
        assert_eq!(def.params.window(), 5);
        assert_eq!(def.lookback, 6);

        let dd = registry.get("max_drawdown_60").unwrap();
        assert_eq!(dd.lookback, 60);
        assert_eq!(dd.category, FactorCategory::Volatility);
    }

    #[test]
    fn test_unknown_names() {
        let registry = FactorRegistry::with_defaults();
        assert!(matches!(registry.get("book_to_price"), Err(RondaError::FactorNotFound(_))));
        assert!(matches!(registry.get("momentum_x"), Err(RondaError::FactorNotFound(_))));
        assert!(matches!(registry.get("momentum_0"), Err(RondaError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_registry_counts() {
        let mut registry = FactorRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);

        let rsi = FactorRegistry::with_defaults().get("rsi").unwrap();
        registry.register(rsi).unwrap();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = FactorRegistry::with_defaults();
        let def = registry.get("rsi").unwrap();
        assert!(registry.register(def.clone()).is_err());

        let custom = FactorDefinition {
            name: "rsi_fast".to_string(),
            ..def
        };
        registry.register(custom).unwrap();
        assert_eq!(registry.get("rsi_fast").unwrap().params.window(), 14);
    }

    #[test]
    fn test_category_descriptions() {
        for category in FactorCategory::all() {
            assert!(!category.description().is_empty());
        }
    }
}
