//! In-memory tabular data
//!
//! The engine never trusts the dtypes of an uploaded file beyond one bit of
//! information: whether a column arrived as numbers. Everything else is held
//! as heterogeneous [`Cell`]s and coerced explicitly by the stages that need
//! numbers or dates (see [`coerce`]).
//!
//! - [`RawTable`] - columns exactly as loaded
//! - [`NormalizedTable`] - the same columns with canonical, unique identifiers

pub mod coerce;
mod normalize;

pub use coerce::{coerce_numeric, parse_date, Coerced};
pub use normalize::{normalize_identifier, ColumnNormalizer};

use crate::error::{ForecastError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// A single heterogeneous cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Textual form used for categorical grouping; `None` for empty cells
    pub fn as_label(&self) -> Option<String> {
        match self {
            Cell::Number(v) => Some(format_number(*v)),
            Cell::Text(s) => Some(s.clone()),
            Cell::Empty => None,
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            Cell::Number(v)
        } else {
            Cell::Empty
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::from(s.as_str())
    }
}

impl From<Option<&str>> for Cell {
    fn from(s: Option<&str>) -> Self {
        s.map(Cell::from).unwrap_or(Cell::Empty)
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map(Cell::from).unwrap_or(Cell::Empty)
    }
}

/// Integral floats print without a trailing `.0` so `12.0` and `"12"` group together
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

/// A named column of cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    cells: Vec<Cell>,
    /// Source dtype was integer or float
    numeric: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>, numeric: bool) -> Self {
        Self {
            name: name.into(),
            cells,
            numeric,
        }
    }

    /// Column that arrived with a numeric dtype
    pub fn numeric<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Cell>,
    {
        Self::new(name, values.into_iter().map(Into::into).collect(), true)
    }

    /// Column that arrived as free text; empty strings become [`Cell::Empty`]
    pub fn text<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Cell>,
    {
        Self::new(name, values.into_iter().map(Into::into).collect(), false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn renamed(self, name: String) -> Self {
        Self { name, ..self }
    }

    fn from_polars(column: &polars::prelude::Column) -> Result<Self> {
        let name = column.name().to_string();
        let series = column.as_materialized_series();
        let dtype = series.dtype();

        if dtype.is_integer() || dtype.is_float() {
            let as_f64 = series.cast(&DataType::Float64)?;
            let cells = as_f64.f64()?.into_iter().map(Cell::from).collect();
            return Ok(Self::new(name, cells, true));
        }

        let cells = match series.cast(&DataType::String) {
            Ok(as_str) => as_str.str()?.into_iter().map(Cell::from).collect(),
            Err(_) => (0..series.len())
                .map(|i| match series.get(i) {
                    Ok(AnyValue::Null) | Err(_) => Cell::Empty,
                    Ok(value) => Cell::from(value.to_string().as_str()),
                })
                .collect(),
        };
        Ok(Self::new(name, cells, false))
    }
}

/// Columns exactly as they arrived from the loader
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    columns: Vec<Column>,
    n_rows: usize,
}

impl RawTable {
    /// Build a table, checking that every column has the same length
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != n_rows) {
            return Err(ForecastError::ShapeError {
                expected: format!("{} rows", n_rows),
                actual: format!("column '{}' has {} rows", bad.name(), bad.len()),
            });
        }
        Ok(Self { columns, n_rows })
    }

    /// Convert a loaded DataFrame, keeping only the numeric-or-not bit of each dtype
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let columns = df
            .get_columns()
            .iter()
            .map(Column::from_polars)
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0 || self.columns.is_empty()
    }

    pub(crate) fn into_columns(self) -> Vec<Column> {
        self.columns
    }
}

/// A table whose identifiers are canonical and unique
///
/// Only [`ColumnNormalizer`] constructs this type.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    columns: Vec<Column>,
    n_rows: usize,
}

impl NormalizedTable {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Position of a column in table order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }
}
