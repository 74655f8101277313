//! Automatic schema resolution
//!
//! Uploaded datasets arrive with unknown column names. The detectors in this
//! module are pure functions of a [`NormalizedTable`] with documented
//! acceptance thresholds:
//! - [`DateAxisDetector`] - timeline column, or a synthesized daily sequence
//! - [`TargetDetector`] - numeric column to forecast
//! - [`RouteDetector`] - up to three origin/destination-like columns

mod date_axis;
mod route;
mod target;

pub use date_axis::{DateAxisDetector, DATE_NAME_TOKENS};
pub use route::RouteDetector;
pub use target::{TargetDetector, TARGET_HINTS};

use crate::error::{ForecastError, Result};
use crate::table::NormalizedTable;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Where the timeline comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateAxis {
    /// A column whose values parse as dates
    Column(String),
    /// No usable column; a daily sequence from a fixed anchor is used
    Synthesized,
}

impl DateAxis {
    pub fn column(&self) -> Option<&str> {
        match self {
            DateAxis::Column(name) => Some(name),
            DateAxis::Synthesized => None,
        }
    }

    /// Column name, or `"synthesized"`
    pub fn label(&self) -> &str {
        self.column().unwrap_or("synthesized")
    }
}

/// The schema the engine inferred for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSchema {
    pub date_axis: DateAxis,
    pub target_column: String,
    /// Route-like columns in priority order (at most three)
    pub route_columns: Vec<String>,
}

/// Runs the three detectors over a table
#[derive(Debug, Clone, Default)]
pub struct SchemaDetector {
    date: DateAxisDetector,
    target: TargetDetector,
    route: RouteDetector,
}

impl SchemaDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route_detector(mut self, route: RouteDetector) -> Self {
        self.route = route;
        self
    }

    pub fn with_target_detector(mut self, target: TargetDetector) -> Self {
        self.target = target;
        self
    }

    pub fn with_date_detector(mut self, date: DateAxisDetector) -> Self {
        self.date = date;
        self
    }

    /// Resolve date, target and route columns.
    ///
    /// Fails only when no column coerces to a number.
    pub fn resolve(&self, table: &NormalizedTable) -> Result<ResolvedSchema> {
        let target_column = self
            .target
            .detect(table)
            .ok_or(ForecastError::NoNumericTarget)?;
        let date_axis = self.date.detect(table);
        let route_columns = self.route.detect(table);

        info!(
            target = %target_column,
            date = date_axis.label(),
            routes = ?route_columns,
            "Resolved schema"
        );

        Ok(ResolvedSchema {
            date_axis,
            target_column,
            route_columns,
        })
    }
}
