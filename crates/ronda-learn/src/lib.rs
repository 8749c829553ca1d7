//! Learned factor weights for ronda.
//!
//! Fits a model from factor values to forward returns and reads weights off
//! it: signed coefficients for linear models, feature importances for tree
//! ensembles and networks. Hyperparameters are chosen by date-ordered
//! cross-validation, and the resulting composite is checked with quantile
//! buckets before it is accepted.

pub mod boosting;
pub mod cv;
pub mod forest;
pub mod linear;
pub mod model;
pub mod network;
pub mod optimizer;
pub mod tree;

// Re-export main types
pub use boosting::{BoostingParams, GradientBoosting};
pub use cv::{DateOrderedSplit, Fold};
pub use forest::{ForestParams, RandomForest};
pub use linear::LinearModel;
pub use model::{Regressor, build, mse};
pub use network::{Mlp, MlpParams};
pub use optimizer::{CombinationOptimizer, CvScore, Optimization};
pub use tree::{RegressionTree, TreeParams};
