//! Forecast orchestration
//!
//! [`ForecastEngine`] turns an arbitrary table into a [`ForecastResult`]:
//! schema detection, feature construction, model fitting with fallbacks,
//! calendar trends and per-route scenarios.

mod config;
mod engine;
mod result;
mod scenario;
mod trends;

pub use config::AnalysisConfig;
pub use engine::{ForecastEngine, SchemaReport};
pub use result::{AnalysisResponse, AnalysisSummary, ChartPoint, ForecastResult, Range, RankedMap};
pub use scenario::{top_values, ScenarioForecaster};
pub use trends::Trends;
