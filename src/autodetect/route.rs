//! Route / corridor dimension detection

use crate::table::{Column, NormalizedTable};
use regex::Regex;
use tracing::debug;

/// Finds columns that look like an origin/destination pair
#[derive(Debug, Clone)]
pub struct RouteDetector {
    max_columns: usize,
    /// Non-empty values inspected per column for the value pass
    sample_size: usize,
    /// Share of sampled values that must look like `AAA-BBB`
    min_match_ratio: f64,
    endpoint_name: Regex,
    code_pair: Regex,
}

impl RouteDetector {
    pub fn new() -> Self {
        Self {
            max_columns: 3,
            sample_size: 200,
            min_match_ratio: 0.2,
            endpoint_name: Regex::new(r"(?:^|_)(?:departure|arrival|dep|arr)_(?:airport|city|code)(?:_|$)")
                .expect("static pattern"),
            code_pair: Regex::new(r"^\s*[A-Za-z]{3}\s*(?:->|→|-|/|>)\s*[A-Za-z]{3}\s*$")
                .expect("static pattern"),
        }
    }

    pub fn with_max_columns(mut self, max_columns: usize) -> Self {
        self.max_columns = max_columns;
        self
    }

    /// Name matches in table order, then value matches, capped at `max_columns`
    pub fn detect(&self, table: &NormalizedTable) -> Vec<String> {
        let mut found: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| self.name_matches(c.name()))
            .map(|c| c.name().to_string())
            .collect();

        for column in table.columns() {
            if found.iter().any(|f| f == column.name()) {
                continue;
            }
            if self.values_match(column) {
                found.push(column.name().to_string());
            }
        }

        found.truncate(self.max_columns);
        if !found.is_empty() {
            debug!(columns = ?found, "Route-like columns");
        }
        found
    }

    fn name_matches(&self, name: &str) -> bool {
        name.contains("route")
            || name.contains("origin")
            || name.contains("destination")
            || name
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|token| token == "from" || token == "to")
            || self.endpoint_name.is_match(name)
    }

    fn values_match(&self, column: &Column) -> bool {
        if column.is_numeric() {
            return false;
        }
        let sample: Vec<String> = column
            .cells()
            .iter()
            .filter_map(|c| c.as_label())
            .take(self.sample_size)
            .collect();
        if sample.is_empty() {
            return false;
        }
        let hits = sample.iter().filter(|v| self.code_pair.is_match(v)).count();
        hits as f64 / sample.len() as f64 > self.min_match_ratio
    }

    /// Whether a single value looks like a code pair such as `DEL-BLR`
    pub fn is_code_pair(&self, value: &str) -> bool {
        self.code_pair.is_match(value)
    }
}

impl Default for RouteDetector {
    fn default() -> Self {
        Self::new()
    }
}
