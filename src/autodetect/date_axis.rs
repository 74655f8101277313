//! Time axis detection

use super::DateAxis;
use crate::table::coerce::date_values;
use crate::table::{Column, NormalizedTable};
use tracing::debug;

/// Identifier fragments that suggest a column holds dates
pub const DATE_NAME_TOKENS: &[&str] = &["date", "journey", "booking", "travel", "flight", "dep", "arr"];

/// Picks the column used as the timeline of the dataset
#[derive(Debug, Clone)]
pub struct DateAxisDetector {
    name_tokens: Vec<String>,
    /// Absolute floor of parsed values a column must exceed
    min_parsed: usize,
    /// One parsed value required per this many rows on large tables
    rows_per_parsed: usize,
}

impl DateAxisDetector {
    pub fn new() -> Self {
        Self {
            name_tokens: DATE_NAME_TOKENS.iter().map(|t| t.to_string()).collect(),
            min_parsed: 3,
            rows_per_parsed: 200,
        }
    }

    /// Set the absolute floor of parsed values
    pub fn with_min_parsed(mut self, min_parsed: usize) -> Self {
        self.min_parsed = min_parsed;
        self
    }

    /// `max(min_parsed, rows / rows_per_parsed)`
    pub fn acceptance_threshold(&self, n_rows: usize) -> f64 {
        (self.min_parsed as f64).max(n_rows as f64 / self.rows_per_parsed.max(1) as f64)
    }

    /// A column qualifies when its parsed count exceeds the threshold. Tables too
    /// short to ever exceed the floor qualify when every row parses.
    pub fn accepts(&self, parsed: usize, n_rows: usize) -> bool {
        parsed as f64 > self.acceptance_threshold(n_rows) || (n_rows > 0 && parsed == n_rows)
    }

    /// Name-based pass first, then every column in table order
    pub fn detect(&self, table: &NormalizedTable) -> DateAxis {
        let n_rows = table.n_rows();

        let by_name = table
            .columns()
            .iter()
            .filter(|c| self.name_suggests_date(c.name()))
            .find(|c| self.column_qualifies(c, n_rows));

        let found = by_name.or_else(|| {
            table
                .columns()
                .iter()
                .find(|c| self.column_qualifies(c, n_rows))
        });

        match found {
            Some(column) => DateAxis::Column(column.name().to_string()),
            None => DateAxis::Synthesized,
        }
    }

    fn name_suggests_date(&self, name: &str) -> bool {
        self.name_tokens.iter().any(|t| name.contains(t.as_str()))
    }

    fn column_qualifies(&self, column: &Column, n_rows: usize) -> bool {
        if column.is_numeric() {
            return false;
        }
        let parsed = date_values(column).successes;
        debug!(column = column.name(), parsed, n_rows, "Date parse attempt");
        parsed > 0 && self.accepts(parsed, n_rows)
    }
}

impl Default for DateAxisDetector {
    fn default() -> Self {
        Self::new()
    }
}
