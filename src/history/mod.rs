//! Analysis history
//!
//! Append-only record of past forecasts, keyed by source and dataset name.

mod storage;

pub use storage::{HistoryStore, JsonLinesStore, MemoryStore};

use crate::forecast::ForecastResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// One persisted analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    /// Where the dataset came from, e.g. `"upload"` or `"cli"`
    pub source: String,
    pub dataset_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub result: ForecastResult,
}

impl HistoryRecord {
    pub fn new(source: &str, dataset_name: Option<&str>, result: ForecastResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.to_string(),
            dataset_name: dataset_name.map(str::to_string),
            created_at: Utc::now(),
            result,
        }
    }

    pub fn predicted_demand(&self) -> f64 {
        self.result.predicted_demand
    }

    pub fn festive_avg(&self) -> f64 {
        self.result.festive_avg
    }

    pub fn message(&self) -> &str {
        &self.result.message
    }
}

/// Append a result, logging instead of propagating storage failures
pub fn record_analysis(
    store: &dyn HistoryStore,
    source: &str,
    dataset_name: Option<&str>,
    result: &ForecastResult,
) -> Option<Uuid> {
    let record = HistoryRecord::new(source, dataset_name, result.clone());
    let id = record.id;
    match store.append(record) {
        Ok(()) => {
            debug!(%id, source, "Recorded analysis");
            Some(id)
        }
        Err(e) => {
            warn!(error = %e, source, "Failed to record analysis history");
            None
        }
    }
}
