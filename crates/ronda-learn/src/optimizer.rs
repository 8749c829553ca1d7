//! Learned factor weights with date-ordered hyperparameter search.

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use ronda_combine::{WeightVector, combine_weighted};
use ronda_eval::{BucketAnalysis, QuantileBucketer};
use ronda_traits::linalg::r_squared;
use ronda_traits::{
    Diagnostics, EvalContext, FactorSeries, HyperparamGrid, Hyperparams, ModelKind,
    NormalizeMethod, Normalizer, Panel, Result, ReturnSeries, RondaError,
};

use crate::cv::{DateOrderedSplit, Fold};
use crate::model::{self, mse};

/// Cross-validated error of one grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct CvScore {
    /// The hyperparameters evaluated.
    pub params: Hyperparams,
    /// Mean validation MSE over folds.
    pub mse: f64,
}

/// Result of [`CombinationOptimizer::fit`].
#[derive(Debug, Clone)]
pub struct Optimization {
    /// Model family fitted.
    pub kind: ModelKind,
    /// One weight per factor: signed for linear models, importances otherwise.
    pub weights: WeightVector,
    /// Grid point with the lowest validation error.
    pub best_params: Hyperparams,
    /// Validation MSE of `best_params`; `None` when too few dates for CV.
    pub cv_mse: Option<f64>,
    /// Validation MSE of every grid point, in grid order.
    pub cv_scores: Vec<CvScore>,
    /// R-squared of the final model on the full sample.
    pub in_sample_r2: f64,
    /// Weighted sum of the standardized factors.
    pub composite: FactorSeries,
    /// Quantile buckets of the composite against the returns.
    pub quantile: BucketAnalysis,
    /// Whether the composite's long-short spread reaches `min_long_short_spread`.
    pub accepted: bool,
    /// Groups skipped while standardizing.
    pub diagnostics: Diagnostics,
}

/// Fits a model from factors to forward returns and turns it into weights.
///
/// # Example
///
/// ```rust,ignore
/// use ronda_learn::CombinationOptimizer;
/// use ronda_traits::{HyperparamGrid, ModelKind};
///
/// let grid = HyperparamGrid::new().with("max_depth", vec![3.0, 5.0]);
/// let opt = CombinationOptimizer::new(&ctx).fit(&factors, &returns, ModelKind::RandomForest, &grid)?;
/// println!("weights {:?}, accepted {}", opt.weights, opt.accepted);
/// ```
#[derive(Debug, Clone)]
pub struct CombinationOptimizer {
    ctx: EvalContext,
}

impl CombinationOptimizer {
    /// Create an optimizer bound to a run context.
    pub fn new(ctx: &EvalContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Fit with the model and grid from the run configuration.
    pub fn apply(&self, factors: &[FactorSeries], returns: &ReturnSeries) -> Result<Optimization> {
        let cfg = &self.ctx.config().optimizer;
        self.fit(factors, returns, cfg.model, &cfg.grid)
    }

    /// Search `grid` for `kind`, refit the best point on all data and
    /// validate the resulting composite with quantile buckets.
    ///
    /// Factors are standardized along the configured axis first. Every grid
    /// point is scored by mean validation MSE over date-ordered folds; the
    /// first point with the lowest error wins. When there are too few dates
    /// to form folds, the first grid point is used without scoring.
    ///
    /// # Errors
    ///
    /// - [`RondaError::KeyMismatch`] when factors and returns share no key
    /// - [`RondaError::Model`] when a model cannot be fitted
    pub fn fit(
        &self,
        factors: &[FactorSeries],
        returns: &ReturnSeries,
        kind: ModelKind,
        grid: &HyperparamGrid,
    ) -> Result<Optimization> {
        let _span = self.ctx.enter("optimizer");
        let cfg = self.ctx.config();
        let seed = cfg.optimizer.seed;

        let axis = cfg.normalization.axis;
        let normalizer = Normalizer::new(&self.ctx);
        let mut diagnostics = Diagnostics::new();
        let standardized: Vec<FactorSeries> = factors
            .iter()
            .map(|f| {
                let n = normalizer.normalize(f, axis, NormalizeMethod::Standardize);
                diagnostics.merge(n.diagnostics);
                n.series
            })
            .collect();

        let panel = Panel::new(&standardized, Some(returns.series()))?;
        let points = grid.expand();

        let splitter = DateOrderedSplit::new(cfg.optimizer.n_splits, cfg.effective_gap());
        let cv_scores = match splitter.split(&panel.dates()) {
            Ok(folds) => score_grid(&panel, &folds, kind, &points, seed)?,
            Err(err) => {
                tracing::warn!(%err, "skipping cross-validation");
                Vec::new()
            }
        };
        let best = cv_scores
            .iter()
            .filter(|s| s.mse.is_finite())
            .min_by(|a, b| a.mse.total_cmp(&b.mse));
        let (best_params, cv_mse) = match best {
            Some(s) => (s.params.clone(), Some(s.mse)),
            None => (points.into_iter().next().unwrap_or_default(), None),
        };

        let x = panel.features();
        let y = panel.target()?;
        let mut model = model::build(kind, &best_params, seed);
        model.fit(x, y)?;
        let in_sample_r2 = r_squared(y, &model.predict(x)?);
        let raw = model.feature_weights()?;
        let weights = WeightVector::new(panel.names().iter().map(String::as_str).zip(raw.iter().copied()))?;

        let name = format!("optimized_{}", kind_name(kind));
        let composite = combine_weighted(&standardized, &weights, &name)?;
        let quantile = QuantileBucketer::new(&self.ctx).apply(&composite, returns);
        let spread = quantile.long_short.as_ref().map(|ls| ls.mean);
        let accepted = spread.is_some_and(|s| s >= cfg.optimizer.min_long_short_spread);

        tracing::info!(
            model = kind_name(kind),
            ?best_params,
            cv_mse,
            in_sample_r2,
            spread,
            accepted,
            "combination optimized"
        );

        Ok(Optimization {
            kind,
            weights,
            best_params,
            cv_mse,
            cv_scores,
            in_sample_r2,
            composite,
            quantile,
            accepted,
            diagnostics,
        })
    }
}

fn score_grid(
    panel: &Panel,
    folds: &[Fold],
    kind: ModelKind,
    points: &[Hyperparams],
    seed: u64,
) -> Result<Vec<CvScore>> {
    let splits: Vec<(Array2<f64>, Array1<f64>, Array2<f64>, Array1<f64>)> = folds
        .iter()
        .map(|fold| {
            let (x_train, y_train) = panel.select(&panel.rows_for(&fold.train))?;
            let (x_val, y_val) = panel.select(&panel.rows_for(&fold.validation))?;
            Ok((x_train, y_train, x_val, y_val))
        })
        .collect::<Result<_>>()?;

    points
        .par_iter()
        .map(|params| {
            let mut errors = Vec::with_capacity(splits.len());
            for (x_train, y_train, x_val, y_val) in &splits {
                if x_train.nrows() == 0 || x_val.nrows() == 0 {
                    continue;
                }
                let mut model = model::build(kind, params, seed);
                model.fit(x_train, y_train)?;
                errors.push(mse(y_val, &model.predict(x_val)?));
            }
            if errors.is_empty() {
                return Err(RondaError::InsufficientData("no fold had rows to score".into()));
            }
            let mse = errors.iter().sum::<f64>() / errors.len() as f64;
            tracing::debug!(?params, mse, folds = errors.len(), "grid point scored");
            Ok(CvScore {
                params: params.clone(),
                mse,
            })
        })
        .collect()
}

const fn kind_name(kind: ModelKind) -> &'static str {
    match kind {
        ModelKind::Linear => "linear",
        ModelKind::RandomForest => "random_forest",
        ModelKind::GradientBoosting => "gradient_boosting",
        ModelKind::Mlp => "mlp",
    }
}

#[cfg(test)]
mod tests {
    use ronda_traits::{Date, EvalConfig, Observation, OptimizerConfig, ReturnAnchor};

    use super::*;

    fn ctx(n_splits: usize) -> EvalContext {
        EvalContext::with_run_id(
            EvalConfig {
                horizon: 1,
                num_buckets: 3,
                optimizer: OptimizerConfig {
                    n_splits,
                    ..Default::default()
                },
                ..Default::default()
            },
            "opt",
        )
        .unwrap()
    }

    /// Returns load positively on `good` and negatively on `bad`.
    fn data() -> (Vec<FactorSeries>, ReturnSeries) {
        let start = Date::from_ymd_opt(2024, 1, 1).unwrap();
        let (mut good, mut bad, mut noise, mut ret) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
        for t in 0..30u32 {
            let date = start + chrono::Days::new(u64::from(t));
            for i in 0..12u32 {
                let inst = format!("I{i:02}");
                let g = f64::from((i * 5 + t * 3) % 12);
                let b = f64::from((i * 7 + t) % 12);
                let z = f64::from((i * 11 + t * 7) % 12);
                good.push(Observation::new(inst.as_str(), date, g));
                bad.push(Observation::new(inst.as_str(), date, b));
                noise.push(Observation::new(inst.as_str(), date, z));
                ret.push(Observation::new(inst.as_str(), date, 0.002 * g - 0.001 * b));
            }
        }
        let series = |name: &str, obs: Vec<Observation>| FactorSeries::from_observations(name, obs).unwrap();
        (
            vec![series("good", good), series("bad", bad), series("noise", noise)],
            ReturnSeries::new(series("fwd_ret_1", ret), 1, ReturnAnchor::CloseToClose),
        )
    }

    #[test]
    fn test_linear_keeps_negative_sign() {
        let (factors, returns) = data();
        let grid = HyperparamGrid::new().with("alpha", vec![0.0, 100.0]);
        let opt = CombinationOptimizer::new(&ctx(3))
            .fit(&factors, &returns, ModelKind::Linear, &grid)
            .unwrap();

        assert!(opt.weights.get("good").unwrap() > 0.0);
        assert!(opt.weights.get("bad").unwrap() < 0.0);
        assert_eq!(opt.cv_scores.len(), 2);
        assert!(opt.cv_mse.is_some());
        assert!(opt.in_sample_r2 > 0.9);
        assert!(opt.accepted);
        assert_eq!(opt.composite.name(), "optimized_linear");
    }

    #[test]
    fn test_forest_weights_are_importances() {
        let (factors, returns) = data();
        let grid = HyperparamGrid::new()
            .with("n_estimators", vec![10.0])
            .with("max_depth", vec![3.0]);
        let opt = CombinationOptimizer::new(&ctx(2))
            .fit(&factors, &returns, ModelKind::RandomForest, &grid)
            .unwrap();

        assert!(opt.weights.iter().all(|(_, w)| w >= 0.0));
        assert!((opt.weights.sum() - 1.0).abs() < 1e-9);
        assert!(opt.weights.get("good").unwrap() > opt.weights.get("noise").unwrap());
    }

    #[test]
    fn test_too_few_dates_skips_cv() {
        let (factors, returns) = data();
        let opt = CombinationOptimizer::new(&ctx(50))
            .fit(&factors, &returns, ModelKind::Linear, &HyperparamGrid::new())
            .unwrap();
        assert!(opt.cv_mse.is_none());
        assert!(opt.cv_scores.is_empty());
        assert_eq!(opt.best_params, Hyperparams::default());
    }

    #[test]
    fn test_disjoint_returns() {
        let (factors, _) = data();
        let other = ReturnSeries::new(FactorSeries::new("empty"), 1, ReturnAnchor::CloseToClose);
        let err = CombinationOptimizer::new(&ctx(3))
            .fit(&factors, &other, ModelKind::Linear, &HyperparamGrid::new())
            .unwrap_err();
        assert!(matches!(err, RondaError::KeyMismatch(_)));
    }
}
