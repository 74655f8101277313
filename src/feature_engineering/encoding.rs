//! Bounded categorical encoding
//!
//! Low-cardinality text becomes one-hot indicators with a dropped reference
//! level; high-cardinality text collapses into a single ordinal code so the
//! matrix width stays bounded whatever the upload contains.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Placeholder level for missing text cells
pub const MISSING_LEVEL: &str = "Unknown";

/// How a source column is represented in the feature matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnEncoding {
    /// Numeric source column used as-is
    Numeric { feature: String },
    /// One indicator per non-reference level
    OneHot {
        reference: String,
        /// level -> feature name
        indicators: BTreeMap<String, String>,
    },
    /// Single integer code per level, in sorted level order
    Ordinal {
        feature: String,
        codes: BTreeMap<String, f64>,
    },
}

impl ColumnEncoding {
    /// Feature assignments that represent `value` of the source column
    pub fn assignments(&self, value: &str) -> Vec<(String, f64)> {
        match self {
            ColumnEncoding::Numeric { feature } => value
                .trim()
                .parse::<f64>()
                .map(|v| vec![(feature.clone(), v)])
                .unwrap_or_default(),
            ColumnEncoding::OneHot { indicators, .. } => indicators
                .iter()
                .map(|(level, feature)| (feature.clone(), if level == value { 1.0 } else { 0.0 }))
                .collect(),
            ColumnEncoding::Ordinal { feature, codes } => codes
                .get(value)
                .map(|&code| vec![(feature.clone(), code)])
                .unwrap_or_default(),
        }
    }

    /// Matrix features this encoding writes to
    pub fn features(&self) -> Vec<&str> {
        match self {
            ColumnEncoding::Numeric { feature } | ColumnEncoding::Ordinal { feature, .. } => {
                vec![feature.as_str()]
            }
            ColumnEncoding::OneHot { indicators, .. } => {
                indicators.values().map(|f| f.as_str()).collect()
            }
        }
    }

    pub(crate) fn rename_feature(&mut self, from: &str, to: &str) {
        match self {
            ColumnEncoding::Numeric { feature } | ColumnEncoding::Ordinal { feature, .. } => {
                if feature.as_str() == from {
                    *feature = to.to_string();
                }
            }
            ColumnEncoding::OneHot { indicators, .. } => {
                for name in indicators.values_mut().filter(|n| n.as_str() == from) {
                    *name = to.to_string();
                }
            }
        }
    }

    /// Drop references to features that did not survive; `None` when nothing is left
    pub(crate) fn retain_features<F: Fn(&str) -> bool>(mut self, keep: F) -> Option<Self> {
        match &mut self {
            ColumnEncoding::Numeric { feature } | ColumnEncoding::Ordinal { feature, .. } => {
                if !keep(feature) {
                    return None;
                }
            }
            ColumnEncoding::OneHot { indicators, .. } => {
                indicators.retain(|_, name| keep(name));
                if indicators.is_empty() {
                    return None;
                }
            }
        }
        Some(self)
    }
}

/// Encoded output of one text column
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedColumn {
    pub encoding: ColumnEncoding,
    /// (feature name, value per row)
    pub features: Vec<(String, Vec<f64>)>,
}

/// Chooses between one-hot and ordinal encoding by distinct-value count
#[derive(Debug, Clone)]
pub struct CategoricalEncoder {
    /// Largest distinct count still expanded to one-hot
    max_one_hot_levels: usize,
}

impl CategoricalEncoder {
    pub fn new(max_one_hot_levels: usize) -> Self {
        Self { max_one_hot_levels }
    }

    /// Encode one column of labels (`None` = missing, grouped as [`MISSING_LEVEL`]).
    /// Returns `None` for a column with fewer than two levels.
    pub fn encode(&self, column: &str, labels: &[Option<String>]) -> Option<EncodedColumn> {
        let rows: Vec<&str> = labels
            .iter()
            .map(|l| l.as_deref().unwrap_or(MISSING_LEVEL))
            .collect();
        let levels: BTreeSet<&str> = rows.iter().copied().collect();

        match levels.len() {
            0 | 1 => None,
            n if n <= self.max_one_hot_levels => Some(Self::one_hot(column, &rows, &levels)),
            _ => Some(Self::ordinal(column, &rows, &levels)),
        }
    }

    fn one_hot(column: &str, rows: &[&str], levels: &BTreeSet<&str>) -> EncodedColumn {
        let mut iter = levels.iter();
        let reference = iter.next().map(|l| l.to_string()).unwrap_or_default();

        let mut indicators = BTreeMap::new();
        let mut features = Vec::new();
        for level in iter {
            let name = format!("{}_{}", column, level);
            let values = rows.iter().map(|r| if r == level { 1.0 } else { 0.0 }).collect();
            indicators.insert(level.to_string(), name.clone());
            features.push((name, values));
        }

        EncodedColumn {
            encoding: ColumnEncoding::OneHot {
                reference,
                indicators,
            },
            features,
        }
    }

    fn ordinal(column: &str, rows: &[&str], levels: &BTreeSet<&str>) -> EncodedColumn {
        let codes: BTreeMap<String, f64> = levels
            .iter()
            .enumerate()
            .map(|(code, level)| (level.to_string(), code as f64))
            .collect();
        let values = rows.iter().map(|r| codes[*r]).collect();
        let feature = format!("{}_code", column);

        EncodedColumn {
            features: vec![(feature.clone(), values)],
            encoding: ColumnEncoding::Ordinal { feature, codes },
        }
    }
}

impl Default for CategoricalEncoder {
    fn default() -> Self {
        Self::new(50)
    }
}
