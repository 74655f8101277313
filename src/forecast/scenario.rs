//! Per-route what-if forecasts

use super::result::RankedMap;
use crate::error::{ForecastError, Result};
use crate::feature_engineering::FeatureMatrix;
use crate::training::GradientBoostingRegressor;
use crate::utils::stats;
use ndarray::{Array1, Array2};
use std::collections::HashMap;
use tracing::debug;

/// Forecasts for the most frequent values of the primary route column
#[derive(Debug, Clone)]
pub struct ScenarioForecaster {
    top_routes: usize,
}

impl Default for ScenarioForecaster {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ScenarioForecaster {
    pub fn new(top_routes: usize) -> Self {
        Self { top_routes }
    }

    /// Predict a median row with each route value's encoding applied
    pub fn model_forecast(
        &self,
        matrix: &FeatureMatrix,
        model: &GradientBoostingRegressor,
    ) -> Result<RankedMap> {
        let Some((column, labels)) = self.primary(matrix) else {
            return Ok(RankedMap::new());
        };
        // Without features for the route every scenario is the same baseline row
        let Some(encoding) = matrix.encoding(column) else {
            debug!(column, "Primary route column has no features");
            return Ok(RankedMap::new());
        };
        let routes = top_values(labels, self.top_routes);
        if routes.is_empty() {
            return Ok(RankedMap::new());
        }

        let baseline = median_row(matrix);
        let mut scenarios = Array2::<f64>::zeros((routes.len(), baseline.len()));
        for (r, route) in routes.iter().enumerate() {
            let mut row = baseline.clone();
            for (feature, value) in encoding.assignments(route) {
                if let Some(j) = matrix.feature_index(&feature) {
                    row[j] = value;
                }
            }
            scenarios.row_mut(r).assign(&row);
        }

        let predictions = model.predict(&scenarios)?;
        if predictions.iter().any(|p| !p.is_finite()) {
            return Err(ForecastError::ComputationError(
                "Scenario prediction is not finite".to_string(),
            ));
        }
        Ok(RankedMap::descending(
            routes.into_iter().zip(predictions.iter().copied()).collect(),
        ))
    }

    /// Mean observed target per route value, used when no model was trained
    pub fn descriptive_forecast(&self, matrix: &FeatureMatrix) -> RankedMap {
        let Some((_, labels)) = self.primary(matrix) else {
            return RankedMap::new();
        };
        let routes = top_values(labels, self.top_routes);
        let entries = routes
            .into_iter()
            .filter_map(|route| {
                let values: Vec<f64> = labels
                    .iter()
                    .zip(matrix.y.iter())
                    .filter(|(label, _)| label.as_deref() == Some(route.as_str()))
                    .map(|(_, &y)| y)
                    .collect();
                stats::mean(&values).map(|mean| (route, mean))
            })
            .collect();
        RankedMap::descending(entries)
    }

    fn primary<'a>(&self, matrix: &'a FeatureMatrix) -> Option<(&'a str, &'a [Option<String>])> {
        let column = matrix.meta.route_like_columns.first()?;
        let labels = matrix.rows.primary_route()?;
        Some((column.as_str(), labels))
    }
}

/// Up to `k` most frequent non-missing values; ties keep first-seen order
pub fn top_values(labels: &[Option<String>], k: usize) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (i, label) in labels.iter().enumerate() {
        if let Some(label) = label {
            counts.entry(label.as_str()).or_insert((0, i)).0 += 1;
        }
    }
    let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(k).map(|(v, _)| v.to_string()).collect()
}

fn median_row(matrix: &FeatureMatrix) -> Array1<f64> {
    matrix
        .x
        .columns()
        .into_iter()
        .map(|col| stats::median(&col.to_vec()).unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_engineering::{ColumnEncoding, FeatureMeta, RowContext};
    use crate::training::GradientBoostingConfig;
    use std::collections::BTreeMap;

    fn labels(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    /// Route one-hot plus a noise column; demand is driven by the route
    fn route_matrix() -> FeatureMatrix {
        let routes: Vec<&str> = (0..60)
            .map(|i| match i % 3 {
                0 => "DEL-BLR",
                1 => "BOM-DEL",
                _ => "HYD-MAA",
            })
            .collect();
        let n = routes.len();
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => (routes[i] == "DEL-BLR") as u8 as f64,
            1 => (routes[i] == "HYD-MAA") as u8 as f64,
            _ => (i % 5) as f64,
        });
        let y = Array1::from_iter(routes.iter().map(|r| match *r {
            "DEL-BLR" => 300.0,
            "BOM-DEL" => 200.0,
            _ => 100.0,
        }));
        let indicators = BTreeMap::from([
            ("DEL-BLR".to_string(), "route_DEL-BLR".to_string()),
            ("HYD-MAA".to_string(), "route_HYD-MAA".to_string()),
        ]);
        FeatureMatrix {
            x,
            y,
            feature_names: vec!["route_DEL-BLR".into(), "route_HYD-MAA".into(), "noise".into()],
            encodings: vec![(
                "route".into(),
                ColumnEncoding::OneHot {
                    reference: "BOM-DEL".into(),
                    indicators,
                },
            )],
            rows: RowContext {
                calendar: vec![None; n],
                festival: vec![false; n],
                routes: vec![labels(&routes)],
            },
            meta: FeatureMeta {
                route_like_columns: vec!["route".into()],
                row_count: n,
                feature_count: 3,
                synthesized_dates: true,
            },
        }
    }

    #[test]
    fn test_top_values_ties_first_seen() {
        let values = labels(&["b", "a", "a", "c", "b", "d"]);
        assert_eq!(top_values(&values, 3), vec!["b", "a", "c"]);
        assert_eq!(top_values(&[None, None], 3), Vec::<String>::new());
    }

    #[test]
    fn test_model_forecast_orders_routes() {
        let matrix = route_matrix();
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
            colsample_bytree: 1.0,
            subsample: 1.0,
            ..Default::default()
        });
        model.fit(&matrix.x, &matrix.y).unwrap();

        let forecast = ScenarioForecaster::default()
            .model_forecast(&matrix, &model)
            .unwrap();
        let keys: Vec<&str> = forecast.keys().collect();
        assert_eq!(keys, vec!["DEL-BLR", "BOM-DEL", "HYD-MAA"]);
    }

    #[test]
    fn test_unencoded_route_column_is_empty() {
        let mut matrix = route_matrix();
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig::default());
        model.fit(&matrix.x, &matrix.y).unwrap();
        matrix.encodings.clear();

        let forecast = ScenarioForecaster::default()
            .model_forecast(&matrix, &model)
            .unwrap();
        assert!(forecast.is_empty());
    }

    #[test]
    fn test_descriptive_forecast_means() {
        let matrix = route_matrix();
        let forecast = ScenarioForecaster::new(2).descriptive_forecast(&matrix);
        assert_eq!(forecast.len(), 2);
        assert_eq!(forecast.get("DEL-BLR"), Some(300.0));
        assert_eq!(forecast.get("BOM-DEL"), Some(200.0));
    }

    #[test]
    fn test_no_route_column_is_empty() {
        let mut matrix = route_matrix();
        matrix.meta.route_like_columns.clear();
        matrix.rows.routes.clear();
        assert!(ScenarioForecaster::default().descriptive_forecast(&matrix).is_empty());
    }
}
