//! Calendar features derived from the resolved date axis

use crate::autodetect::DateAxis;
use crate::table::coerce::date_values;
use crate::table::NormalizedTable;
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Names of the derived calendar features, in matrix order
pub const CALENDAR_FEATURES: [&str; 5] = ["month", "day_of_week", "is_weekend", "quarter", "year"];

/// Calendar breakdown of one date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarParts {
    /// 1-12
    pub month: u32,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    pub is_weekend: bool,
    /// 1-4
    pub quarter: u32,
    pub year: i32,
}

impl CalendarParts {
    pub fn from_date(date: NaiveDate) -> Self {
        let month = date.month();
        let day_of_week = date.weekday().num_days_from_monday();
        Self {
            month,
            day_of_week,
            is_weekend: day_of_week >= 5,
            quarter: (month - 1) / 3 + 1,
            year: date.year(),
        }
    }

    /// Values in [`CALENDAR_FEATURES`] order
    pub fn feature_values(&self) -> [f64; 5] {
        [
            self.month as f64,
            self.day_of_week as f64,
            if self.is_weekend { 1.0 } else { 0.0 },
            self.quarter as f64,
            self.year as f64,
        ]
    }
}

/// One optional date per table row
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarAxis {
    pub dates: Vec<Option<NaiveDate>>,
    pub synthesized: bool,
}

impl CalendarAxis {
    /// Read the date column, or synthesize a daily sequence starting at `anchor`
    /// when there is none or when it yields no parseable value.
    pub fn resolve(table: &NormalizedTable, axis: &DateAxis, anchor: NaiveDate) -> Self {
        if let Some(column) = axis.column().and_then(|name| table.column(name)) {
            let parsed = date_values(column);
            if parsed.successes > 0 {
                debug!(column = column.name(), parsed = parsed.successes, "Using date column");
                return Self {
                    dates: parsed.values,
                    synthesized: false,
                };
            }
            warn!(column = column.name(), "Date column produced no dates, synthesizing timeline");
        }
        Self::synthesize(table.n_rows(), anchor)
    }

    /// Consecutive days from `anchor`, one per row
    pub fn synthesize(n_rows: usize, anchor: NaiveDate) -> Self {
        let dates = (0..n_rows)
            .map(|i| anchor.checked_add_days(Days::new(i as u64)))
            .collect();
        Self {
            dates,
            synthesized: true,
        }
    }

    pub fn parts(&self) -> Vec<Option<CalendarParts>> {
        self.dates
            .iter()
            .map(|d| d.map(CalendarParts::from_date))
            .collect()
    }
}
