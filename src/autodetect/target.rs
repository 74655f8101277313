//! Forecast target detection

use crate::table::coerce::numeric_values;
use crate::table::NormalizedTable;
use crate::utils::stats;
use tracing::debug;

/// Identifier hints for the demand/outcome column, highest priority first
pub const TARGET_HINTS: &[&str] = &[
    "num_passengers",
    "passenger",
    "pax",
    "seat",
    "booking",
    "ticket",
    "sold",
    "demand",
    "load",
    "price",
    "fare",
    "revenue",
];

/// Picks the numeric column to forecast
#[derive(Debug, Clone)]
pub struct TargetDetector {
    hints: Vec<String>,
}

impl TargetDetector {
    pub fn new() -> Self {
        Self {
            hints: TARGET_HINTS.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Replace the hint list
    pub fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints = hints.into_iter().map(Into::into).collect();
        self
    }

    /// Hinted columns first (hint priority, then table order); otherwise the
    /// numeric-coercible column with the highest sample variance.
    /// `None` when no column coerces to a single number.
    pub fn detect(&self, table: &NormalizedTable) -> Option<String> {
        for hint in &self.hints {
            let hinted = table
                .columns()
                .iter()
                .filter(|c| c.name().contains(hint.as_str()))
                .find(|c| numeric_values(c).successes > 0);
            if let Some(column) = hinted {
                debug!(column = column.name(), hint = %hint, "Target matched hint");
                return Some(column.name().to_string());
            }
        }

        let mut best: Option<(&str, f64)> = None;
        for column in table.columns() {
            let coerced = numeric_values(column);
            if coerced.successes == 0 {
                continue;
            }
            let values: Vec<f64> = coerced.present().copied().collect();
            let var = stats::variance(&values, 1).unwrap_or(0.0);
            if best.map_or(true, |(_, best_var)| var > best_var) {
                best = Some((column.name(), var));
            }
        }

        best.map(|(name, var)| {
            debug!(column = name, variance = var, "Target chosen by variance");
            name.to_string()
        })
    }
}

impl Default for TargetDetector {
    fn default() -> Self {
        Self::new()
    }
}
