//! Model fitting with graceful degradation
//!
//! The trainer never fails: too-small inputs are summarized descriptively and
//! fitting errors fall back to plain target statistics.

use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use crate::error::{ForecastError, Result};
use crate::feature_engineering::FeatureMatrix;
use crate::utils::stats::{self, DescriptiveStats};
use ndarray::{Array1, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const TRAINED_MESSAGE: &str = "Forecast generated successfully";
pub const DESCRIPTIVE_MESSAGE: &str =
    "Not enough data to train a model; showing descriptive statistics";

/// Point forecast with spread
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub avg: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Estimate {
    /// Target summary with the spread suppressed
    fn descriptive(y: &Array1<f64>) -> Self {
        let stats = target_stats(y);
        Self {
            std: 0.0,
            ..stats
        }
    }
}

fn target_stats(y: &Array1<f64>) -> Estimate {
    let values = y.to_vec();
    DescriptiveStats::from_values(&values)
        .map(|s| Estimate {
            avg: s.mean,
            std: s.std,
            min: s.min,
            max: s.max,
        })
        .unwrap_or(Estimate {
            avg: 0.0,
            std: 0.0,
            min: 0.0,
            max: 0.0,
        })
}

/// One entry of the feature-importance ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub feature: String,
    /// Share of total split gain, in percent
    pub importance: f64,
}

/// A fitted booster and its holdout evaluation
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: GradientBoostingRegressor,
    /// Summary of the holdout predictions
    pub estimate: Estimate,
    pub drivers: Vec<Driver>,
    pub train_rows: usize,
    pub holdout_rows: usize,
}

/// What the trainer produced
#[derive(Debug, Clone)]
pub enum TrainingOutcome {
    Trained(TrainedModel),
    /// Too few rows or no usable feature
    Descriptive(Estimate),
    /// Fitting or prediction failed
    Failed { estimate: Estimate, reason: String },
}

impl TrainingOutcome {
    pub fn estimate(&self) -> Estimate {
        match self {
            TrainingOutcome::Trained(t) => t.estimate,
            TrainingOutcome::Descriptive(e) => *e,
            TrainingOutcome::Failed { estimate, .. } => *estimate,
        }
    }

    pub fn model(&self) -> Option<&GradientBoostingRegressor> {
        match self {
            TrainingOutcome::Trained(t) => Some(&t.model),
            _ => None,
        }
    }

    pub fn drivers(&self) -> &[Driver] {
        match self {
            TrainingOutcome::Trained(t) => &t.drivers,
            _ => &[],
        }
    }

    pub fn message(&self) -> String {
        match self {
            TrainingOutcome::Trained(_) => TRAINED_MESSAGE.to_string(),
            TrainingOutcome::Descriptive(_) => DESCRIPTIVE_MESSAGE.to_string(),
            TrainingOutcome::Failed { reason, .. } => format!(
                "Model training failed ({}); showing descriptive statistics",
                reason
            ),
        }
    }
}

/// Holdout fraction for `n` rows: 1/n clamped to [0.1, 0.2]
pub fn holdout_fraction(n: usize) -> f64 {
    if n == 0 {
        return 0.2;
    }
    (1.0 / n as f64).max(0.1).min(0.2)
}

/// Seeded shuffled split into (train, holdout) row indices
pub fn holdout_split(n: usize, seed: Option<u64>) -> (Vec<usize>, Vec<usize>) {
    // tolerance keeps 30 * 0.1 from rounding up to 4
    let holdout = ((n as f64 * holdout_fraction(n) - 1e-9).ceil() as usize).min(n.saturating_sub(1));
    let mut rng = match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    };
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    let test = indices.split_off(n - holdout);
    (indices, test)
}

/// Fits the booster or degrades
#[derive(Debug, Clone)]
pub struct ModelTrainer {
    booster: GradientBoostingConfig,
    min_rows: usize,
    top_drivers: usize,
}

impl Default for ModelTrainer {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl ModelTrainer {
    pub fn new(booster: GradientBoostingConfig) -> Self {
        Self {
            booster,
            min_rows: 5,
            top_drivers: 5,
        }
    }

    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    pub fn with_top_drivers(mut self, n: usize) -> Self {
        self.top_drivers = n;
        self
    }

    pub fn train(&self, matrix: &FeatureMatrix) -> TrainingOutcome {
        if matrix.n_features() == 0 || matrix.n_rows() < self.min_rows {
            info!(
                rows = matrix.n_rows(),
                features = matrix.n_features(),
                "Too little data for a model, using descriptive statistics"
            );
            return TrainingOutcome::Descriptive(Estimate::descriptive(&matrix.y));
        }

        match self.fit(matrix) {
            Ok(trained) => {
                info!(
                    trees = trained.model.n_trees(),
                    holdout = trained.holdout_rows,
                    predicted = trained.estimate.avg,
                    "Model trained"
                );
                TrainingOutcome::Trained(trained)
            }
            Err(e) => {
                warn!(error = %e, "Model training failed, falling back to target statistics");
                TrainingOutcome::Failed {
                    estimate: target_stats(&matrix.y),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn fit(&self, matrix: &FeatureMatrix) -> Result<TrainedModel> {
        let (train_idx, test_idx) = holdout_split(matrix.n_rows(), self.booster.random_state);
        let x_train = matrix.x.select(Axis(0), &train_idx);
        let y_train = matrix.y.select(Axis(0), &train_idx);
        let x_test = matrix.x.select(Axis(0), &test_idx);
        let y_test = matrix.y.select(Axis(0), &test_idx);

        let mut model = GradientBoostingRegressor::new(self.booster.clone());
        model.fit_with_validation(&x_train, &y_train, &x_test, &y_test)?;

        let predictions = model.predict(&x_test)?;
        let values = predictions.to_vec();
        if values.is_empty() || values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ComputationError(
                "Model produced non-finite predictions".to_string(),
            ));
        }

        let estimate = Estimate {
            avg: stats::mean(&values).unwrap_or(0.0),
            std: stats::variance(&values, 0).unwrap_or(0.0).sqrt(),
            min: stats::min(&values).unwrap_or(0.0),
            max: stats::max(&values).unwrap_or(0.0),
        };
        let drivers = self.rank_drivers(&matrix.feature_names, model.feature_importances());

        Ok(TrainedModel {
            model,
            estimate,
            drivers,
            train_rows: train_idx.len(),
            holdout_rows: test_idx.len(),
        })
    }

    fn rank_drivers(&self, names: &[String], importances: &[f64]) -> Vec<Driver> {
        let mut ranked: Vec<Driver> = names
            .iter()
            .zip(importances)
            .filter(|(_, imp)| **imp > 0.0)
            .map(|(name, &imp)| Driver {
                feature: name.clone(),
                importance: imp * 100.0,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(self.top_drivers);
        ranked
    }
}
