//! End-to-end analysis pipeline

use super::config::AnalysisConfig;
use super::result::{AnalysisResponse, AnalysisSummary, ForecastResult, Range, RankedMap};
use super::scenario::ScenarioForecaster;
use super::trends::Trends;
use crate::autodetect::{ResolvedSchema, RouteDetector, SchemaDetector};
use crate::error::{ForecastError, Result};
use crate::feature_engineering::{ColumnEncoding, FeatureMatrix, FeatureMatrixBuilder};
use crate::history::{record_analysis, HistoryStore};
use crate::table::{ColumnNormalizer, RawTable};
use crate::training::TrainingOutcome;
use crate::utils::{stats, DatasetLoader};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

/// Schema and feature layout inferred for a dataset, without training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub schema: ResolvedSchema,
    pub rows: usize,
    pub feature_names: Vec<String>,
    pub encodings: Vec<(String, ColumnEncoding)>,
    pub synthesized_dates: bool,
}

/// Runs normalization, detection, feature building, training and aggregation
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    config: AnalysisConfig,
    normalizer: ColumnNormalizer,
    detector: SchemaDetector,
    builder: FeatureMatrixBuilder,
    scenarios: ScenarioForecaster,
    loader: DatasetLoader,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::build(AnalysisConfig::default())
    }
}

impl ForecastEngine {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: AnalysisConfig) -> Self {
        let detector = SchemaDetector::new().with_route_detector(
            RouteDetector::new().with_max_columns(config.max_route_columns),
        );
        Self {
            normalizer: ColumnNormalizer::new(),
            detector,
            builder: FeatureMatrixBuilder::new(config.feature_config()),
            scenarios: ScenarioForecaster::new(config.top_routes),
            loader: DatasetLoader::new(),
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a loaded table
    pub fn analyze(&self, table: RawTable) -> Result<ForecastResult> {
        let start = Instant::now();
        let (schema, matrix) = self.prepare(table)?;
        let outcome = self.config.trainer().train(&matrix);
        let result = self.summarize(&schema, &matrix, &outcome);

        info!(
            predicted = result.predicted_demand,
            routes = result.per_route_forecast.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );
        Ok(result)
    }

    fn summarize(
        &self,
        schema: &ResolvedSchema,
        matrix: &FeatureMatrix,
        outcome: &TrainingOutcome,
    ) -> ForecastResult {
        let estimate = outcome.estimate();
        let trends = Trends::aggregate(matrix);
        let per_route_forecast = self.route_forecast(matrix, outcome);

        ForecastResult {
            predicted_demand: estimate.avg,
            variation_std: estimate.std,
            range: Range {
                min: estimate.min,
                max: estimate.max,
            },
            chart_data: trends.chart_data(),
            monthly_trends: trends.monthly,
            weekday_trends: trends.weekday,
            festive_avg: trends.festive_avg,
            per_route_forecast,
            message: outcome.message(),
            analysis: AnalysisSummary {
                rows: matrix.n_rows(),
                target_column: schema.target_column.clone(),
                date_column: schema.date_axis.label().to_string(),
                route_columns: schema.route_columns.clone(),
                feature_count: matrix.n_features(),
                average_target: stats::mean(&matrix.y.to_vec()).unwrap_or(0.0),
            },
            top_drivers: outcome.drivers().to_vec(),
        }
    }

    /// Analyze a polars frame
    pub fn analyze_dataframe(&self, df: &DataFrame) -> Result<ForecastResult> {
        self.analyze(RawTable::from_dataframe(df)?)
    }

    /// Load a file and analyze it
    pub fn analyze_path(&self, path: impl AsRef<Path>) -> Result<ForecastResult> {
        self.analyze(self.loader.load_path(path)?)
    }

    /// Analyze an uploaded delimited file; `None` means nothing was uploaded
    pub fn analyze_upload(&self, upload: Option<&[u8]>, separator: u8) -> Result<ForecastResult> {
        let bytes = upload.ok_or(ForecastError::NoDataset)?;
        self.analyze(self.loader.load_bytes(bytes, separator)?)
    }

    /// Map an analysis outcome to its wire shape
    pub fn respond(&self, outcome: Result<ForecastResult>) -> AnalysisResponse {
        match outcome {
            Ok(result) => AnalysisResponse::from(result),
            Err(e) if e.is_input_error() => {
                info!(error = %e, "Rejected dataset");
                AnalysisResponse::from(e)
            }
            Err(e) => {
                error!(error = %e, "Analysis failed");
                AnalysisResponse::from(e)
            }
        }
    }

    /// Analyze and append successful results to `store`; storage failures are
    /// logged and do not change the response.
    pub fn analyze_and_record(
        &self,
        source: &str,
        dataset_name: Option<&str>,
        table: RawTable,
        store: &dyn HistoryStore,
    ) -> AnalysisResponse {
        let outcome = self.analyze(table);
        if let Ok(result) = &outcome {
            record_analysis(store, source, dataset_name, result);
        }
        self.respond(outcome)
    }

    /// Resolve the schema and feature layout without training
    pub fn inspect(&self, table: RawTable) -> Result<SchemaReport> {
        let (schema, matrix) = self.prepare(table)?;
        Ok(SchemaReport {
            rows: matrix.n_rows(),
            feature_names: matrix.feature_names,
            encodings: matrix.encodings,
            synthesized_dates: matrix.meta.synthesized_dates,
            schema,
        })
    }

    fn prepare(&self, table: RawTable) -> Result<(ResolvedSchema, FeatureMatrix)> {
        if table.is_empty() {
            return Err(ForecastError::EmptyDataset(
                "Empty or unreadable dataset".to_string(),
            ));
        }
        let table = self.normalizer.normalize(table);
        let schema = self.detector.resolve(&table)?;
        let matrix = self.builder.build(&table, &schema)?;
        Ok((schema, matrix))
    }

    fn route_forecast(&self, matrix: &FeatureMatrix, outcome: &TrainingOutcome) -> RankedMap {
        match outcome.model() {
            Some(model) => match self.scenarios.model_forecast(matrix, model) {
                Ok(forecast) => forecast,
                Err(e) => {
                    warn!(error = %e, "Per-route forecast failed");
                    RankedMap::new()
                }
            },
            None => self.scenarios.descriptive_forecast(matrix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryStore;
    use crate::table::Column;

    fn three_rows() -> RawTable {
        RawTable::new(vec![
            Column::text("date", vec!["2024-01-05", "2024-01-12", "2024-02-01"]),
            Column::numeric("num_passengers", vec![120.0, 140.0, 90.0]),
            Column::text("route", vec!["DEL-BLR", "DEL-BLR", "BOM-DEL"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_three_row_descriptive() {
        let result = ForecastEngine::default().analyze(three_rows()).unwrap();

        assert_eq!(result.variation_std, 0.0);
        assert!(result.message.contains("descriptive statistics"));
        assert!((result.predicted_demand - 350.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.range, Range { min: 90.0, max: 140.0 });
        assert_eq!(result.monthly_trends.get(&1), Some(&130.0));
        assert_eq!(result.monthly_trends.get(&2), Some(&90.0));
        assert_eq!(result.per_route_forecast.get("DEL-BLR"), Some(130.0));
        assert_eq!(result.per_route_forecast.get("BOM-DEL"), Some(90.0));
        assert_eq!(result.analysis.target_column, "num_passengers");
        assert_eq!(result.analysis.date_column, "date");
        assert!(result.top_drivers.is_empty());
    }

    #[test]
    fn test_missing_target_response() {
        let table = RawTable::new(vec![Column::text("route", vec!["DEL-BLR", "BOM-DEL"])]).unwrap();
        let engine = ForecastEngine::default();
        let response = engine.respond(engine.analyze(table));
        assert_eq!(
            response,
            AnalysisResponse::error("No numeric column found to analyze as demand/target")
        );
    }

    #[test]
    fn test_no_upload() {
        let engine = ForecastEngine::default();
        let err = engine.analyze_upload(None, b',').unwrap_err();
        assert!(matches!(err, ForecastError::NoDataset));
        assert!(err.is_input_error());
    }

    #[test]
    fn test_record_only_successes() {
        let engine = ForecastEngine::default();
        let store = MemoryStore::new();

        let ok = engine.analyze_and_record("upload", Some("tiny.csv"), three_rows(), &store);
        assert!(!ok.is_error());
        let bad = RawTable::new(vec![Column::text("x", vec!["a"])]).unwrap();
        let err = engine.analyze_and_record("upload", None, bad, &store);
        assert!(err.is_error());

        let records = store.recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].dataset_name.as_deref(), Some("tiny.csv"));
    }

    #[test]
    fn test_inspect_reports_layout() {
        let report = ForecastEngine::default().inspect(three_rows()).unwrap();
        assert_eq!(report.rows, 3);
        assert_eq!(report.schema.route_columns, vec!["route"]);
        assert!(report.feature_names.contains(&"route_DEL-BLR".to_string()));
    }

    fn route_driven(n: usize, fillers: usize) -> RawTable {
        let routes = ["DEL-BLR", "BOM-DEL", "HYD-MAA"];
        let mut columns: Vec<Column> = (0..fillers)
            .map(|k| {
                let values: Vec<String> =
                    (0..n).map(|i| format!("v{}", (i / (k + 5)) % 2)).collect();
                Column::text(format!("note{}", k), values)
            })
            .collect();
        let dates: Vec<String> = (0..n)
            .map(|i| format!("2024-{:02}-{:02}", i % 12 + 1, i % 27 + 1))
            .collect();
        columns.push(Column::text("date", dates));
        columns.push(Column::text("route", (0..n).map(|i| routes[i % 3])));
        columns.push(Column::numeric(
            "demand",
            (0..n).map(|i| 300.0 - 100.0 * (i % 3) as f64),
        ));
        RawTable::new(columns).unwrap()
    }

    #[test]
    fn test_route_encoded_beyond_text_cap() {
        let engine = ForecastEngine::default();
        let report = engine.inspect(route_driven(90, 6)).unwrap();
        assert!(report.feature_names.iter().any(|f| f.starts_with("route_")));

        let result = engine.analyze(route_driven(90, 6)).unwrap();
        let keys: Vec<&str> = result.per_route_forecast.keys().collect();
        assert_eq!(keys, vec!["DEL-BLR", "BOM-DEL", "HYD-MAA"]);
        let values: Vec<f64> = result.per_route_forecast.iter().map(|(_, v)| v).collect();
        assert!(values[0] - values[2] > 50.0);
    }

    #[test]
    fn test_route_forecast_failure_keeps_result() {
        use crate::training::{Estimate, GradientBoostingRegressor, TrainedModel, TRAINED_MESSAGE};
        use ndarray::{Array1, Array2};

        let engine = ForecastEngine::default();
        let (schema, matrix) = engine.prepare(route_driven(60, 0)).unwrap();

        // fitted on one extra column, so scenario prediction is a shape error
        let width = matrix.n_features() + 1;
        let x = Array2::from_shape_fn((20, width), |(i, j)| ((i * (j + 1)) % 7) as f64);
        let y = Array1::from_iter((0..20).map(|i| i as f64));
        let mut model = GradientBoostingRegressor::new(Default::default());
        model.fit(&x, &y).unwrap();

        let estimate = Estimate { avg: 200.0, std: 10.0, min: 100.0, max: 300.0 };
        let outcome = TrainingOutcome::Trained(TrainedModel {
            model,
            estimate,
            drivers: Vec::new(),
            train_rows: 48,
            holdout_rows: 12,
        });
        let result = engine.summarize(&schema, &matrix, &outcome);

        assert!(result.per_route_forecast.is_empty());
        assert_eq!(result.message, TRAINED_MESSAGE);
        assert_eq!(result.predicted_demand, 200.0);
        assert_eq!(result.range, Range { min: 100.0, max: 300.0 });
        assert_eq!(result.monthly_trends.len(), 12);
        assert_eq!(result.analysis.route_columns, vec!["route"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig::default().with_min_rows_for_model(0);
        assert!(ForecastEngine::new(config).is_err());
    }
}
