//! seatcast - Schema-agnostic tabular demand forecasting
//!
//! Given a table with unknown column names, seatcast infers a timeline, a
//! numeric target and route-like columns, builds a purely numeric feature
//! matrix, fits a gradient-boosted regressor when there is enough data and
//! reports a demand forecast with calendar trends and per-route scenarios.
//!
//! # Modules
//!
//! ## Data
//! - [`table`] - Raw tables, header normalization, numeric and date coercion
//! - [`utils`] - Dataset loading and descriptive statistics
//!
//! ## Analysis
//! - [`autodetect`] - Date axis, target and route detection
//! - [`feature_engineering`] - Calendar, festival and categorical features
//! - [`training`] - Regression trees and gradient boosting
//! - [`forecast`] - End-to-end engine, trends, scenarios and the result shape
//!
//! ## Services
//! - [`history`] - Append-only analysis history
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data
pub mod table;
pub mod utils;

// Analysis
pub mod autodetect;
pub mod feature_engineering;
pub mod training;
pub mod forecast;

// Services
pub mod history;
pub mod cli;

pub use error::{ForecastError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ForecastError, Result};

    // Tables
    pub use crate::table::{Cell, Column, ColumnNormalizer, NormalizedTable, RawTable};
    pub use crate::utils::{DatasetFormat, DatasetLoader};

    // Detection
    pub use crate::autodetect::{DateAxis, ResolvedSchema, SchemaDetector};

    // Features
    pub use crate::feature_engineering::{FeatureConfig, FeatureMatrix, FeatureMatrixBuilder};

    // Training
    pub use crate::training::{GradientBoostingConfig, GradientBoostingRegressor, ModelTrainer, TrainingOutcome};

    // Forecast
    pub use crate::forecast::{AnalysisConfig, AnalysisResponse, ForecastEngine, ForecastResult};

    // History
    pub use crate::history::{HistoryRecord, HistoryStore, JsonLinesStore, MemoryStore};
}
