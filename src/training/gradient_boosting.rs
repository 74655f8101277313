//! Gradient-boosted regression trees
//!
//! Squared-error boosting over [`RegressionTree`] learners with row and column
//! subsampling and optional early stopping on a validation set.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::decision_tree::RegressionTree;
use crate::error::{ForecastError, Result};

/// Booster settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    /// Maximum number of boosting rounds
    pub n_estimators: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Row fraction drawn per round
    pub subsample: f64,
    /// Column fraction drawn per round
    pub colsample_bytree: f64,
    /// Stop after this many rounds without validation improvement
    pub early_stopping_rounds: Option<usize>,
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            min_samples_leaf: 1,
            subsample: 0.8,
            colsample_bytree: 0.8,
            early_stopping_rounds: Some(10),
            random_state: Some(42),
        }
    }
}

impl GradientBoostingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", self.n_estimators, "must be at least 1"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid("learning_rate", self.learning_rate, "must be positive"));
        }
        if self.max_depth == 0 {
            return Err(invalid("max_depth", self.max_depth, "must be at least 1"));
        }
        for (name, value) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(name, value, "must be in (0, 1]"));
            }
        }
        Ok(())
    }
}

fn invalid(name: &str, value: impl ToString, reason: &str) -> ForecastError {
    ForecastError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Boosted ensemble of regression trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    trees: Vec<RegressionTree>,
    col_indices_per_tree: Vec<Vec<usize>>,
    initial_prediction: f64,
    n_features: usize,
    feature_importances: Vec<f64>,
    best_iteration: Option<usize>,
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            col_indices_per_tree: Vec::new(),
            initial_prediction: 0.0,
            n_features: 0,
            feature_importances: Vec::new(),
            best_iteration: None,
        }
    }

    /// Fit for the configured number of rounds
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.fit_inner(x, y, None)
    }

    /// Fit while tracking validation MSE; with `early_stopping_rounds` set,
    /// training halts after that many rounds without improvement and the
    /// ensemble is truncated to its best round.
    pub fn fit_with_validation(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        x_val: &Array2<f64>,
        y_val: &Array1<f64>,
    ) -> Result<()> {
        if x_val.ncols() != x.ncols() || x_val.nrows() != y_val.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("validation set with {} features", x.ncols()),
                actual: format!("{}x{} / {} targets", x_val.nrows(), x_val.ncols(), y_val.len()),
            });
        }
        if x_val.iter().chain(y_val.iter()).any(|v| !v.is_finite()) {
            return Err(ForecastError::TrainingError(
                "Validation data contains non-finite values".to_string(),
            ));
        }
        self.fit_inner(x, y, Some((x_val, y_val)))
    }

    fn fit_inner(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        validation: Option<(&Array2<f64>, &Array1<f64>)>,
    ) -> Result<()> {
        self.config.validate()?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || n_features == 0 {
            return Err(ForecastError::TrainingError(format!(
                "Cannot boost on a {}x{} matrix",
                n_samples, n_features
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(ForecastError::TrainingError(
                "Training data contains non-finite values".to_string(),
            ));
        }

        self.trees.clear();
        self.col_indices_per_tree.clear();
        self.best_iteration = None;
        self.n_features = n_features;
        self.initial_prediction = y.mean().unwrap_or(0.0);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);
        let mut val_predictions =
            validation.map(|(xv, _)| Array1::from_elem(xv.nrows(), self.initial_prediction));
        let mut best_loss = f64::INFINITY;
        let mut best_round = 0usize;

        for round in 0..self.config.n_estimators {
            let residuals = y - &predictions;

            let rows = sample_indices(n_samples, self.config.subsample, &mut rng);
            let cols = sample_indices(n_features, self.config.colsample_bytree, &mut rng);
            let x_sub = x.select(Axis(0), &rows).select(Axis(1), &cols);
            let r_sub = residuals.select(Axis(0), &rows);

            let mut tree = RegressionTree::new()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit(&x_sub, &r_sub)?;

            let update = tree.predict(&x.select(Axis(1), &cols))?;
            predictions.scaled_add(self.config.learning_rate, &update);

            self.trees.push(tree);
            self.col_indices_per_tree.push(cols);

            if let (Some((xv, yv)), Some(vp)) = (validation, val_predictions.as_mut()) {
                let (tree, cols) = (&self.trees[round], &self.col_indices_per_tree[round]);
                let val_update = tree.predict(&xv.select(Axis(1), cols))?;
                vp.scaled_add(self.config.learning_rate, &val_update);

                let loss = mse(yv, vp);
                if loss < best_loss {
                    best_loss = loss;
                    best_round = round;
                } else if let Some(patience) = self.config.early_stopping_rounds {
                    if round - best_round >= patience {
                        debug!(round, best_round, "Early stopping");
                        break;
                    }
                }
            }
        }

        if validation.is_some() && self.config.early_stopping_rounds.is_some() {
            self.trees.truncate(best_round + 1);
            self.col_indices_per_tree.truncate(best_round + 1);
            self.best_iteration = Some(best_round);
        }

        self.compute_importances();
        Ok(())
    }

    fn compute_importances(&mut self) {
        let mut importances = vec![0.0; self.n_features];
        for (tree, cols) in self.trees.iter().zip(&self.col_indices_per_tree) {
            for (j, &col) in cols.iter().enumerate() {
                importances[col] += tree.split_gains().get(j).copied().unwrap_or(0.0);
            }
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = importances;
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(ForecastError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ForecastError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for (tree, cols) in self.trees.iter().zip(&self.col_indices_per_tree) {
            let update = tree.predict(&x.select(Axis(1), cols))?;
            predictions.scaled_add(self.config.learning_rate, &update);
        }
        Ok(predictions)
    }

    /// Normalized total gain per feature (sums to 1 when any split was made)
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Zero-based round kept by early stopping
    pub fn best_iteration(&self) -> Option<usize> {
        self.best_iteration
    }
}

/// Sorted random subset of `0..n` with `ceil(n * fraction)` members (at least one)
fn sample_indices(n: usize, fraction: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let size = (((n as f64) * fraction).ceil() as usize).clamp(1, n);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(size);
    indices.sort_unstable();
    indices
}

fn mse(y: &Array1<f64>, pred: &Array1<f64>) -> f64 {
    y.iter()
        .zip(pred.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        / y.len().max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regression_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * (j + 1)) as f64 * 0.1);
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| row[0] * 2.0 + row[1] * 0.5 + 1.0)
            .collect();
        (x, y)
    }

    #[test]
    fn test_regressor_beats_mean() {
        let (x, y) = regression_data(100);
        let config = GradientBoostingConfig {
            n_estimators: 20,
            max_depth: 3,
            ..Default::default()
        };
        let mut model = GradientBoostingRegressor::new(config);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions.len(), 100);
        let y_var = y.var(0.0);
        assert!(mse(&y, &predictions) < y_var);
    }

    #[test]
    fn test_feature_importances_normalized() {
        let (x, y) = regression_data(60);
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
            n_estimators: 10,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let importances = model.feature_importances();
        assert_eq!(importances.len(), 2);
        let sum: f64 = importances.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let (x, y) = regression_data(50);
        let fit = || {
            let mut m = GradientBoostingRegressor::new(GradientBoostingConfig {
                n_estimators: 15,
                random_state: Some(7),
                ..Default::default()
            });
            m.fit(&x, &y).unwrap();
            m.predict(&x).unwrap()
        };
        assert_eq!(fit(), fit());
    }

    #[test]
    fn test_early_stopping_truncates() {
        let (x, y) = regression_data(80);
        // validation targets unrelated to the features stop improvement quickly
        let x_val = x.slice(ndarray::s![..10, ..]).to_owned();
        let y_val = Array1::from_elem(10, 1000.0);
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
            n_estimators: 100,
            early_stopping_rounds: Some(3),
            ..Default::default()
        });
        model.fit_with_validation(&x, &y, &x_val, &y_val).unwrap();

        let best = model.best_iteration().unwrap();
        assert_eq!(model.n_trees(), best + 1);
        assert!(model.n_trees() < 100);
    }

    #[test]
    fn test_rejects_non_finite_input() {
        let x = Array2::from_elem((4, 1), f64::NAN);
        let y = Array1::from_elem(4, 1.0);
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig::default());
        assert!(matches!(model.fit(&x, &y), Err(ForecastError::TrainingError(_))));
    }

    #[test]
    fn test_predict_before_fit() {
        let model = GradientBoostingRegressor::new(GradientBoostingConfig::default());
        assert!(matches!(
            model.predict(&Array2::zeros((1, 1))),
            Err(ForecastError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_config_validation() {
        let bad = GradientBoostingConfig {
            subsample: 0.0,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(ForecastError::InvalidParameter { .. })));
        assert!(GradientBoostingConfig::default().validate().is_ok());
    }
}
