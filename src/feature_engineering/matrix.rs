//! Feature matrix construction

use super::calendar::{CalendarAxis, CalendarParts, CALENDAR_FEATURES};
use super::encoding::{CategoricalEncoder, ColumnEncoding};
use super::festival::FestivalCalendar;
use crate::autodetect::ResolvedSchema;
use crate::error::{ForecastError, Result};
use crate::table::coerce::{coerce_numeric, numeric_values};
use crate::table::{Column, NormalizedTable};
use crate::utils::stats;
use chrono::NaiveDate;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// Name of the derived festival indicator
pub const FESTIVAL_FEATURE: &str = "is_festival";

/// Feature builder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Text columns considered for encoding, in table order
    pub max_text_features: usize,
    /// Largest distinct count still one-hot encoded
    pub one_hot_max_levels: usize,
    /// First day of a synthesized timeline
    pub synthetic_anchor: NaiveDate,
    pub festival: FestivalCalendar,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            max_text_features: 6,
            one_hot_max_levels: 50,
            synthetic_anchor: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            festival: FestivalCalendar::default(),
        }
    }
}

/// Shape summary attached to every matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMeta {
    pub route_like_columns: Vec<String>,
    pub row_count: usize,
    pub feature_count: usize,
    pub synthesized_dates: bool,
}

/// Per-row values the aggregators need besides X and y
#[derive(Debug, Clone, PartialEq)]
pub struct RowContext {
    pub calendar: Vec<Option<CalendarParts>>,
    pub festival: Vec<bool>,
    /// Labels of each route-like column, aligned with `meta.route_like_columns`
    pub routes: Vec<Vec<Option<String>>>,
}

impl RowContext {
    /// Labels of the primary route-like column
    pub fn primary_route(&self) -> Option<&[Option<String>]> {
        self.routes.first().map(|r| r.as_slice())
    }
}

/// Numeric design matrix plus what is needed to interpret it
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub feature_names: Vec<String>,
    /// (source column, encoding) for every source column represented in `x`
    pub encodings: Vec<(String, ColumnEncoding)>,
    pub rows: RowContext,
    pub meta: FeatureMeta,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|f| f == name)
    }

    pub fn encoding(&self, column: &str) -> Option<&ColumnEncoding> {
        self.encodings
            .iter()
            .find(|(source, _)| source == column)
            .map(|(_, e)| e)
    }
}

/// Candidate feature before median fill
struct Candidate {
    name: String,
    values: Vec<Option<f64>>,
}

/// Turns a normalized table and its resolved schema into a [`FeatureMatrix`]
#[derive(Debug, Clone, Default)]
pub struct FeatureMatrixBuilder {
    config: FeatureConfig,
}

impl FeatureMatrixBuilder {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, table: &NormalizedTable, schema: &ResolvedSchema) -> Result<FeatureMatrix> {
        let target = table
            .column(&schema.target_column)
            .ok_or_else(|| ForecastError::ColumnNotFound(schema.target_column.clone()))?;

        let axis = CalendarAxis::resolve(table, &schema.date_axis, self.config.synthetic_anchor);
        let all_parts = axis.parts();
        let all_routes = self.route_labels(table, &schema.route_columns);
        let all_festival: Vec<bool> = (0..table.n_rows())
            .map(|i| {
                let values: Vec<Option<&str>> =
                    all_routes.iter().map(|r| r[i].as_deref()).collect();
                self.config.festival.flag(
                    all_parts[i].map(|p| p.month),
                    &values,
                    !schema.route_columns.is_empty(),
                )
            })
            .collect();

        // Rows whose target does not coerce carry no signal
        let coerced = numeric_values(target);
        let kept: Vec<usize> = coerced
            .values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|_| i))
            .collect();
        let dropped = table.n_rows() - kept.len();
        if dropped > 0 {
            debug!(dropped, "Dropped rows with non-numeric target");
        }

        let y = Array1::from_iter(kept.iter().filter_map(|&i| coerced.values[i]));
        let parts: Vec<Option<CalendarParts>> = kept.iter().map(|&i| all_parts[i]).collect();
        let festival: Vec<bool> = kept.iter().map(|&i| all_festival[i]).collect();
        let routes: Vec<Vec<Option<String>>> = all_routes
            .iter()
            .map(|r| kept.iter().map(|&i| r[i].clone()).collect())
            .collect();

        let (mut candidates, mut encodings) =
            self.numeric_candidates(table, schema, &kept, &parts, &festival);
        let mut used: HashSet<String> = candidates.iter().map(|c| c.name.clone()).collect();
        self.encode_text_columns(table, schema, &kept, &mut candidates, &mut encodings, &mut used);

        // Median fill, then drop columns that carry no variation
        let mut columns: Vec<(String, Vec<f64>)> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let present: Vec<f64> = candidate.values.iter().flatten().copied().collect();
            let fill = stats::median(&present).unwrap_or(0.0);
            let filled: Vec<f64> = candidate.values.iter().map(|v| v.unwrap_or(fill)).collect();
            let constant = match (stats::min(&filled), stats::max(&filled)) {
                (Some(lo), Some(hi)) => lo == hi,
                _ => true,
            };
            if constant {
                debug!(feature = %candidate.name, "Dropping constant feature");
                continue;
            }
            columns.push((candidate.name, filled));
        }

        let kept_names: HashSet<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        let encodings: Vec<(String, ColumnEncoding)> = encodings
            .into_iter()
            .filter_map(|(source, enc)| {
                enc.retain_features(|f| kept_names.contains(f))
                    .map(|e| (source, e))
            })
            .collect();

        let n_rows = y.len();
        let x = Array2::from_shape_fn((n_rows, columns.len()), |(i, j)| columns[j].1[i]);
        let feature_names: Vec<String> = columns.into_iter().map(|(n, _)| n).collect();

        info!(
            rows = n_rows,
            features = feature_names.len(),
            synthesized_dates = axis.synthesized,
            "Built feature matrix"
        );

        Ok(FeatureMatrix {
            meta: FeatureMeta {
                route_like_columns: schema.route_columns.clone(),
                row_count: n_rows,
                feature_count: feature_names.len(),
                synthesized_dates: axis.synthesized,
            },
            x,
            y,
            feature_names,
            encodings,
            rows: RowContext {
                calendar: parts,
                festival,
                routes,
            },
        })
    }

    fn route_labels(&self, table: &NormalizedTable, route_columns: &[String]) -> Vec<Vec<Option<String>>> {
        route_columns
            .iter()
            .map(|name| match table.column(name) {
                Some(column) => column.cells().iter().map(|c| c.as_label()).collect(),
                None => vec![None; table.n_rows()],
            })
            .collect()
    }

    /// Already-numeric source columns plus the derived calendar and festival
    /// features. A derived feature takes the slot of a same-named source column.
    fn numeric_candidates(
        &self,
        table: &NormalizedTable,
        schema: &ResolvedSchema,
        kept: &[usize],
        parts: &[Option<CalendarParts>],
        festival: &[bool],
    ) -> (Vec<Candidate>, Vec<(String, ColumnEncoding)>) {
        let mut derived: Vec<Candidate> = CALENDAR_FEATURES
            .iter()
            .enumerate()
            .map(|(k, name)| Candidate {
                name: name.to_string(),
                values: parts.iter().map(|p| p.map(|p| p.feature_values()[k])).collect(),
            })
            .collect();
        derived.push(Candidate {
            name: FESTIVAL_FEATURE.to_string(),
            values: festival.iter().map(|&f| Some(if f { 1.0 } else { 0.0 })).collect(),
        });

        let mut candidates = Vec::new();
        let mut encodings = Vec::new();
        for column in table.columns() {
            if !column.is_numeric() || column.name() == schema.target_column {
                continue;
            }
            if let Some(pos) = derived.iter().position(|d| d.name == column.name()) {
                candidates.push(derived.remove(pos));
                continue;
            }
            candidates.push(Candidate {
                name: column.name().to_string(),
                values: kept.iter().map(|&i| coerce_numeric(&column.cells()[i])).collect(),
            });
            encodings.push((
                column.name().to_string(),
                ColumnEncoding::Numeric {
                    feature: column.name().to_string(),
                },
            ));
        }
        candidates.extend(derived);
        (candidates, encodings)
    }

    fn encode_text_columns(
        &self,
        table: &NormalizedTable,
        schema: &ResolvedSchema,
        kept: &[usize],
        candidates: &mut Vec<Candidate>,
        encodings: &mut Vec<(String, ColumnEncoding)>,
        used: &mut HashSet<String>,
    ) {
        let encoder = CategoricalEncoder::new(self.config.one_hot_max_levels);
        let date_column = schema.date_axis.column();

        let eligible = |c: &&Column| {
            !c.is_numeric() && c.name() != schema.target_column && Some(c.name()) != date_column
        };
        // Route columns are always encoded; the cap applies to the rest
        let routes = schema
            .route_columns
            .iter()
            .filter_map(|name| table.column(name))
            .filter(eligible);
        let others = table
            .columns()
            .iter()
            .filter(eligible)
            .filter(|c| !schema.route_columns.iter().any(|r| r == c.name()))
            .take(self.config.max_text_features);
        let text_columns: Vec<&Column> = routes.chain(others).collect();

        for column in text_columns {
            let labels: Vec<Option<String>> =
                kept.iter().map(|&i| column.cells()[i].as_label()).collect();
            let Some(encoded) = encoder.encode(column.name(), &labels) else {
                debug!(column = column.name(), "Skipping single-level text column");
                continue;
            };

            let mut encoding = encoded.encoding;
            for (name, values) in encoded.features {
                let unique = unique_name(used, &name);
                if unique != name {
                    encoding.rename_feature(&name, &unique);
                }
                candidates.push(Candidate {
                    name: unique,
                    values: values.into_iter().map(Some).collect(),
                });
            }
            encodings.push((column.name().to_string(), encoding));
        }
    }
}

fn unique_name(used: &mut HashSet<String>, base: &str) -> String {
    let mut name = base.to_string();
    let mut suffix = 1;
    while used.contains(&name) {
        name = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    used.insert(name.clone());
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autodetect::{DateAxis, SchemaDetector};
    use crate::table::{Column, ColumnNormalizer, RawTable};

    fn normalized(columns: Vec<Column>) -> NormalizedTable {
        ColumnNormalizer::new().normalize(RawTable::new(columns).unwrap())
    }

    fn build(table: &NormalizedTable) -> FeatureMatrix {
        let schema = SchemaDetector::new().resolve(table).unwrap();
        FeatureMatrixBuilder::default().build(table, &schema).unwrap()
    }

    #[test]
    fn test_three_row_scenario() {
        let table = normalized(vec![
            Column::text("date", vec!["2024-01-05", "2024-01-12", "2024-02-01"]),
            Column::numeric("num_passengers", vec![120.0, 140.0, 90.0]),
            Column::text("route", vec!["DEL-BLR", "DEL-BLR", "BOM-DEL"]),
        ]);
        let matrix = build(&table);

        assert_eq!(matrix.n_rows(), 3);
        assert_eq!(matrix.y.to_vec(), vec![120.0, 140.0, 90.0]);
        // weekend/quarter/year/festival are constant here and dropped
        assert_eq!(matrix.feature_names, vec!["month", "day_of_week", "route_DEL-BLR"]);
        assert_eq!(matrix.meta.route_like_columns, vec!["route"]);
        assert_eq!(matrix.meta.feature_count, 3);
        assert!(!matrix.meta.synthesized_dates);
        assert_eq!(
            matrix.rows.primary_route().unwrap()[2].as_deref(),
            Some("BOM-DEL")
        );
        assert!(matches!(
            matrix.encoding("route"),
            Some(ColumnEncoding::OneHot { .. })
        ));
    }

    #[test]
    fn test_non_numeric_targets_dropped_and_median_fill() {
        let table = normalized(vec![
            Column::text("demand", vec!["10", "n/a", "30", "1,000"]),
            Column::new(
                "capacity",
                vec![100.0.into(), 200.0.into(), crate::table::Cell::Empty, 400.0.into()],
                true,
            ),
        ]);
        let matrix = build(&table);

        assert_eq!(matrix.y.to_vec(), vec![10.0, 30.0, 1000.0]);
        let cap = matrix.feature_index("capacity").unwrap();
        // kept rows: 100, missing, 400 -> median 250
        assert_eq!(matrix.x[[1, cap]], 250.0);
        assert!(matrix.x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_high_cardinality_adds_one_feature() {
        let n = 200;
        let dates: Vec<String> = (0..n)
            .map(|i| format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1))
            .collect();
        let ids: Vec<String> = (0..n).map(|i| format!("c{}", i)).collect();
        let with_ids = normalized(vec![
            Column::text("date", dates.iter().map(|s| s.as_str())),
            Column::numeric("sold", (0..n).map(|i| (i % 17) as f64)),
            Column::text("customer", ids.iter().map(|s| s.as_str())),
        ]);
        let without_ids = normalized(vec![
            Column::text("date", dates.iter().map(|s| s.as_str())),
            Column::numeric("sold", (0..n).map(|i| (i % 17) as f64)),
        ]);

        let a = build(&with_ids);
        let b = build(&without_ids);
        assert_eq!(a.n_features(), b.n_features() + 1);
        assert!(a.feature_index("customer_code").is_some());
    }

    #[test]
    fn test_derived_feature_replaces_source_column() {
        let table = normalized(vec![
            Column::numeric("month", vec![99.0, 98.0, 97.0, 96.0]),
            Column::numeric("fare", vec![5.0, 6.0, 7.0, 8.0]),
        ]);
        let schema = ResolvedSchema {
            date_axis: DateAxis::Synthesized,
            target_column: "fare".into(),
            route_columns: vec![],
        };
        let matrix = FeatureMatrixBuilder::default().build(&table, &schema).unwrap();
        // synthesized Jan 1..4 gives a single month, so the derived column is constant
        assert!(matrix.feature_index("month").is_none());
        assert!(matrix.feature_index("day_of_week").is_some());
    }

    #[test]
    fn test_route_column_encoded_past_text_cap() {
        let n = 12;
        let mut columns: Vec<Column> = (0..7)
            .map(|k| {
                let values: Vec<String> =
                    (0..n).map(|i| format!("v{}", (i / (k + 1)) % 2)).collect();
                Column::text(format!("note{}", k), values)
            })
            .collect();
        let routes = ["DEL-BLR", "BOM-DEL", "HYD-MAA"];
        columns.push(Column::text("route", (0..n).map(|i| routes[i % 3])));
        columns.push(Column::numeric("pax", (0..n).map(|i| (i % 3) as f64 * 100.0)));
        let matrix = build(&normalized(columns));

        assert!(matrix.feature_index("route_DEL-BLR").is_some());
        assert!(matrix.feature_index("route_HYD-MAA").is_some());
        assert!(matrix.encoding("note5").is_some());
        assert!(matrix.encoding("note6").is_none());
    }

    #[test]
    fn test_text_column_named_like_calendar_feature() {
        let table = normalized(vec![
            Column::numeric("pax", vec![10.0, 20.0, 30.0, 10.0, 20.0, 30.0]),
            Column::text("Month", vec!["Jan", "Feb", "Mar", "Jan", "Feb", "Mar"]),
        ]);
        let matrix = build(&table);

        assert!(matches!(
            matrix.encoding("month"),
            Some(ColumnEncoding::OneHot { .. })
        ));
        assert!(matrix.feature_index("month_Jan").is_some());
        assert!(matrix.feature_index("month_Mar").is_some());
    }

    #[test]
    fn test_unique_feature_names() {
        let mut used: HashSet<String> = ["route_x".to_string()].into_iter().collect();
        assert_eq!(unique_name(&mut used, "route_x"), "route_x_1");
        assert_eq!(unique_name(&mut used, "route_x"), "route_x_2");
        assert_eq!(unique_name(&mut used, "other"), "other");
    }
}
