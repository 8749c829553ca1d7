//! Pairwise factor correlation, used to spot redundant factors before combining.

use ronda_traits::stats;
use ronda_traits::{EvalContext, FactorSeries};
use serde::{Deserialize, Serialize};

/// Average per-date Pearson correlation between every pair of factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Factor names, in input order.
    pub names: Vec<String>,
    /// `values[i][j]`: mean daily correlation of factors i and j; `None` when no date qualified.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Correlations of `factors` over their common keys.
    ///
    /// For each pair, every date with at least 2 shared instruments and
    /// non-constant values on both sides contributes one Pearson correlation;
    /// the matrix entry is their mean. The diagonal is 1.
    pub fn compute(ctx: &EvalContext, factors: &[FactorSeries]) -> Self {
        let _span = ctx.enter("correlation");
        let k = factors.len();
        let mut values = vec![vec![None; k]; k];

        for i in 0..k {
            values[i][i] = Some(1.0);
            for j in (i + 1)..k {
                let daily: Vec<f64> = factors[i]
                    .join_by_date(&factors[j])
                    .into_values()
                    .filter_map(|rows| {
                        let x: Vec<f64> = rows.iter().map(|r| r.1).collect();
                        let y: Vec<f64> = rows.iter().map(|r| r.2).collect();
                        stats::pearson(&x, &y)
                    })
                    .collect();
                let mean = stats::mean(&daily);
                values[i][j] = mean;
                values[j][i] = mean;
            }
        }

        Self {
            names: factors.iter().map(|f| f.name().to_string()).collect(),
            values,
        }
    }

    /// Correlation between two named factors.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        self.values[i][j]
    }

    /// Pairs whose absolute correlation is at least `threshold`, strongest first.
    pub fn redundant_pairs(&self, threshold: f64) -> Vec<(String, String, f64)> {
        let mut out = Vec::new();
        for i in 0..self.names.len() {
            for j in (i + 1)..self.names.len() {
                if let Some(c) = self.values[i][j]
                    && c.abs() >= threshold
                {
                    out.push((self.names[i].clone(), self.names[j].clone(), c));
                }
            }
        }
        out.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
        out
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ronda_traits::{Date, Observation};

    use super::*;

    fn series(name: &str, f: impl Fn(usize) -> f64) -> FactorSeries {
        let date = Date::from_ymd_opt(2024, 1, 2).unwrap();
        FactorSeries::from_observations(
            name,
            (0..5).map(|i| Observation::new(format!("I{i}").as_str(), date, f(i))),
        )
        .unwrap()
    }

    #[test]
    fn test_matrix() {
        let a = series("a", |i| i as f64);
        let b = series("b", |i| 2.0 * i as f64 + 1.0);
        let c = series("c", |i| -(i as f64));
        let flat = series("flat", |_| 3.0);
        let m = CorrelationMatrix::compute(&EvalContext::default(), &[a, b, c, flat]);

        assert_abs_diff_eq!(m.get("a", "b").unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.get("a", "c").unwrap(), -1.0, epsilon = 1e-12);
        assert_eq!(m.get("a", "flat"), None);
        assert_eq!(m.get("flat", "flat"), Some(1.0));

        let pairs = m.redundant_pairs(0.9);
        assert_eq!(pairs.len(), 3);
    }
}
