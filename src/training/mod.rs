//! Model training
//!
//! A native gradient-boosted regression tree ensemble and the trainer that
//! wraps it with holdout evaluation and descriptive fallbacks.

pub mod decision_tree;
pub mod gradient_boosting;
mod trainer;

pub use decision_tree::{RegressionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use trainer::{
    holdout_fraction, holdout_split, Driver, Estimate, ModelTrainer, TrainedModel, TrainingOutcome,
    DESCRIPTIVE_MESSAGE, TRAINED_MESSAGE,
};
