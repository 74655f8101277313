//! Result shapes returned to callers and persisted to history

use crate::error::ForecastError;
use crate::training::Driver;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// One point of the monthly chart series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub month: u32,
    pub value: f64,
}

/// Label-to-value mapping that keeps its insertion order on the wire
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedMap(Vec<(String, f64)>);

impl RankedMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries sorted by value, largest first; equal values keep their order
    pub fn descending(mut entries: Vec<(String, f64)>) -> Self {
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Self(entries)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for RankedMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RankedMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RankedVisitor;

        impl<'de> Visitor<'de> for RankedVisitor {
            type Value = RankedMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of labels to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RankedMap, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, f64>()? {
                    entries.push((k, v));
                }
                Ok(RankedMap(entries))
            }
        }

        deserializer.deserialize_map(RankedVisitor)
    }
}

/// What the engine inferred and used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Rows with a numeric target
    pub rows: usize,
    pub target_column: String,
    /// Date column identifier, or `"synthesized"`
    pub date_column: String,
    pub route_columns: Vec<String>,
    pub feature_count: usize,
    pub average_target: f64,
}

/// Outcome of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub predicted_demand: f64,
    pub variation_std: f64,
    pub range: Range,
    /// Mean target per month, 1-12
    pub monthly_trends: BTreeMap<u32, f64>,
    /// Mean target per weekday, 0 = Monday
    pub weekday_trends: BTreeMap<u32, f64>,
    pub festive_avg: f64,
    pub per_route_forecast: RankedMap,
    pub chart_data: Vec<ChartPoint>,
    pub message: String,
    pub analysis: AnalysisSummary,
    #[serde(default)]
    pub top_drivers: Vec<Driver>,
}

/// Wire shape: a forecast or `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisResponse {
    Forecast(Box<ForecastResult>),
    Error { error: String },
}

impl AnalysisResponse {
    pub fn error(message: impl Into<String>) -> Self {
        AnalysisResponse::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AnalysisResponse::Error { .. })
    }

    pub fn forecast(&self) -> Option<&ForecastResult> {
        match self {
            AnalysisResponse::Forecast(result) => Some(&**result),
            AnalysisResponse::Error { .. } => None,
        }
    }
}

impl From<ForecastResult> for AnalysisResponse {
    fn from(result: ForecastResult) -> Self {
        AnalysisResponse::Forecast(Box::new(result))
    }
}

impl From<ForecastError> for AnalysisResponse {
    fn from(err: ForecastError) -> Self {
        AnalysisResponse::error(err.to_string())
    }
}
