//! Analysis configuration

use crate::error::{ForecastError, Result};
use crate::feature_engineering::{FeatureConfig, FestivalCalendar};
use crate::training::{GradientBoostingConfig, ModelTrainer};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one [`ForecastEngine`](super::ForecastEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Seed for the holdout shuffle and the booster; `None` draws from entropy
    pub random_seed: Option<u64>,
    /// Fewer kept rows than this skips model fitting
    pub min_rows_for_model: usize,
    pub max_text_features: usize,
    pub one_hot_max_levels: usize,
    pub max_route_columns: usize,
    /// Route values forecast individually
    pub top_routes: usize,
    /// Features reported in the importance ranking
    pub top_drivers: usize,
    /// First day of a synthesized timeline
    pub synthetic_anchor: NaiveDate,
    pub festival: FestivalCalendar,
    pub booster: GradientBoostingConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let features = FeatureConfig::default();
        Self {
            random_seed: Some(42),
            min_rows_for_model: 5,
            max_text_features: features.max_text_features,
            one_hot_max_levels: features.one_hot_max_levels,
            max_route_columns: 3,
            top_routes: 10,
            top_drivers: 5,
            synthetic_anchor: features.synthetic_anchor,
            festival: features.festival,
            booster: GradientBoostingConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON document; absent fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_random_seed(mut self, seed: Option<u64>) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_min_rows_for_model(mut self, rows: usize) -> Self {
        self.min_rows_for_model = rows;
        self
    }

    pub fn with_max_text_features(mut self, n: usize) -> Self {
        self.max_text_features = n;
        self
    }

    pub fn with_one_hot_max_levels(mut self, n: usize) -> Self {
        self.one_hot_max_levels = n;
        self
    }

    pub fn with_top_routes(mut self, n: usize) -> Self {
        self.top_routes = n;
        self
    }

    pub fn with_booster(mut self, booster: GradientBoostingConfig) -> Self {
        self.booster = booster;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_rows_for_model < 2 {
            return Err(ForecastError::InvalidParameter {
                name: "min_rows_for_model".to_string(),
                value: self.min_rows_for_model.to_string(),
                reason: "a holdout split needs at least 2 rows".to_string(),
            });
        }
        if self.one_hot_max_levels < 2 {
            return Err(ForecastError::InvalidParameter {
                name: "one_hot_max_levels".to_string(),
                value: self.one_hot_max_levels.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.max_route_columns == 0 {
            return Err(ForecastError::InvalidParameter {
                name: "max_route_columns".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        self.booster.validate()
    }

    pub(crate) fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            max_text_features: self.max_text_features,
            one_hot_max_levels: self.one_hot_max_levels,
            synthetic_anchor: self.synthetic_anchor,
            festival: self.festival.clone(),
        }
    }

    /// Booster settings with the analysis seed applied
    pub(crate) fn booster_config(&self) -> GradientBoostingConfig {
        GradientBoostingConfig {
            random_state: self.random_seed,
            ..self.booster.clone()
        }
    }

    pub(crate) fn trainer(&self) -> ModelTrainer {
        ModelTrainer::new(self.booster_config())
            .with_min_rows(self.min_rows_for_model)
            .with_top_drivers(self.top_drivers)
    }
}
