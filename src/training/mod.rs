//! Model training module
//!
//! A regression random forest over the prepared wine dataset:
//! - CART regression trees with variance reduction splits
//! - Bagged forests with per-tree seeded RNGs
//! - Seeded train/test partitioning
//! - Regression metrics (MSE, RMSE, MAE, R²)
//! - [`TrainEngine`], which binds a forest to its feature names
//! - The tracked training flow

mod config;
mod engine;
mod pipeline;
pub mod decision_tree;
pub mod metrics;
pub mod random_forest;
pub mod split;

pub use config::TrainingConfig;
pub use decision_tree::{DecisionTree, TreeNode};
pub use engine::{TrainEngine, TrainingScores};
pub use metrics::{r2_score, RegressionMetrics};
pub use pipeline::{run_training, TrainingSummary};
pub use random_forest::{MaxFeatures, RandomForest};
pub use split::{train_test_split, TrainTestSplit};
