//! Explicit, per-cell coercion to numbers and calendar dates
//!
//! Every conversion is fallible and returns `Option`; column-level helpers
//! count successes instead of inferring them from missing values afterwards.

use super::{Cell, Column};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M",
];

// Month-first before day-first, matching the usual CSV export convention.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%Y%m%d",
];

/// Column values after coercion, with the number of cells that converted
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced<T> {
    pub values: Vec<Option<T>>,
    pub successes: usize,
}

impl<T> Coerced<T> {
    fn collect<I: Iterator<Item = Option<T>>>(iter: I) -> Self {
        let values: Vec<Option<T>> = iter.collect();
        let successes = values.iter().filter(|v| v.is_some()).count();
        Self { values, successes }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Converted values only, in row order
    pub fn present(&self) -> impl Iterator<Item = &T> {
        self.values.iter().flatten()
    }
}

/// Best-effort numeric conversion of one cell
///
/// Text is trimmed and thousands separators are stripped (`"1,200"` → 1200).
/// Non-finite results count as failures.
pub fn coerce_numeric(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(v) if v.is_finite() => Some(*v),
        Cell::Number(_) | Cell::Empty => None,
        Cell::Text(s) => {
            let cleaned: String = s.trim().chars().filter(|&c| c != ',').collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
        }
    }
}

/// Best-effort calendar date parsing of one cell
///
/// Numeric cells are never read as epoch offsets.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    let text = match cell {
        Cell::Text(s) => s.trim(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        })
}

/// Coerce a whole column to numbers
pub fn numeric_values(column: &Column) -> Coerced<f64> {
    Coerced::collect(column.cells().iter().map(coerce_numeric))
}

/// Parse a whole column as dates
pub fn date_values(column: &Column) -> Coerced<NaiveDate> {
    Coerced::collect(column.cells().iter().map(parse_date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(coerce_numeric(&Cell::Number(4.5)), Some(4.5));
        assert_eq!(coerce_numeric(&text(" 120 ")), Some(120.0));
        assert_eq!(coerce_numeric(&text("1,200")), Some(1200.0));
        assert_eq!(coerce_numeric(&text("-3.25")), Some(-3.25));
        assert_eq!(coerce_numeric(&text("DEL-BLR")), None);
        assert_eq!(coerce_numeric(&text("inf")), None);
        assert_eq!(coerce_numeric(&Cell::Empty), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let jan5 = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(parse_date(&text("2024-01-05")), Some(jan5));
        assert_eq!(parse_date(&text("2024-01-05 13:45:00")), Some(jan5));
        assert_eq!(parse_date(&text("2024-01-05T13:45:00Z")), Some(jan5));
        assert_eq!(parse_date(&text("01/05/2024")), Some(jan5));
        assert_eq!(parse_date(&text("25/12/2023")), NaiveDate::from_ymd_opt(2023, 12, 25));
        assert_eq!(parse_date(&text("05-Jan-2024")), Some(jan5));
        assert_eq!(parse_date(&text("Jan 5, 2024")), Some(jan5));
    }

    #[test]
    fn test_parse_date_rejects_non_dates() {
        assert_eq!(parse_date(&Cell::Number(20240105.0)), None);
        assert_eq!(parse_date(&text("Mon")), None);
        assert_eq!(parse_date(&text("DEL-BLR")), None);
        assert_eq!(parse_date(&text("")), None);
    }

    #[test]
    fn test_column_success_counts() {
        let column = Column::text("fare", vec!["100", "n/a", "", "2,500"]);
        let coerced = numeric_values(&column);
        assert_eq!(coerced.successes, 2);
        assert_eq!(coerced.values, vec![Some(100.0), None, None, Some(2500.0)]);
        assert_eq!(coerced.present().copied().collect::<Vec<_>>(), vec![100.0, 2500.0]);
    }
}
