//! Column identifier normalization

use super::{NormalizedTable, RawTable};
use std::collections::HashSet;
use tracing::debug;

/// Canonical form of a column identifier: trimmed, lower-cased, whitespace runs
/// replaced by `_`. Blank identifiers become `column_<index>`.
pub fn normalize_identifier(raw: &str, index: usize) -> String {
    let joined = raw
        .split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() {
        format!("column_{}", index)
    } else {
        joined
    }
}

/// Renames the columns of a [`RawTable`]; values are untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnNormalizer;

impl ColumnNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Canonicalize every identifier, suffixing `_1`, `_2`, ... on collisions
    pub fn normalize(&self, table: RawTable) -> NormalizedTable {
        let n_rows = table.n_rows();
        let mut seen: HashSet<String> = HashSet::new();

        let columns = table
            .into_columns()
            .into_iter()
            .enumerate()
            .map(|(index, column)| {
                let base = normalize_identifier(column.name(), index);
                let mut name = base.clone();
                let mut suffix = 1;
                while seen.contains(&name) {
                    name = format!("{}_{}", base, suffix);
                    suffix += 1;
                }
                if name != column.name() {
                    debug!(from = column.name(), to = %name, "Renamed column");
                }
                seen.insert(name.clone());
                column.renamed(name)
            })
            .collect();

        NormalizedTable { columns, n_rows }
    }
}
