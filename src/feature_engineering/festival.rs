//! Festival-season indicator
//!
//! A coarse regional heuristic, not a holiday calendar: a row is festive when
//! one of its route-like values contains an airport code of a region whose
//! festive months include the row's month. Codes are matched as substrings, so
//! unrelated values sharing letters with a code also match.

use serde::{Deserialize, Serialize};

/// Airport codes and festive months of one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FestiveRegion {
    pub name: String,
    pub codes: Vec<String>,
    pub months: Vec<u32>,
}

impl FestiveRegion {
    pub fn new(name: &str, codes: &[&str], months: &[u32]) -> Self {
        Self {
            name: name.to_string(),
            codes: codes.iter().map(|c| c.to_string()).collect(),
            months: months.to_vec(),
        }
    }

    fn matches(&self, value_upper: &str, month: u32) -> bool {
        self.months.contains(&month) && self.codes.iter().any(|c| value_upper.contains(c.as_str()))
    }
}

/// Region table plus the month-only rule used when no route column exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FestivalCalendar {
    pub regions: Vec<FestiveRegion>,
    pub fallback_months: Vec<u32>,
}

impl Default for FestivalCalendar {
    fn default() -> Self {
        Self {
            regions: vec![
                FestiveRegion::new(
                    "india",
                    &[
                        "DEL", "BOM", "BLR", "MAA", "HYD", "CCU", "COK", "AMD", "PNQ", "GOI", "GOX",
                        "TRV", "JAI", "LKO", "ATQ", "IXC", "SXR", "PAT", "BBI", "GAU", "VNS", "NAG",
                        "IDR", "CJB",
                    ],
                    &[10, 11],
                ),
                FestiveRegion::new(
                    "uk",
                    &[
                        "LHR", "LGW", "STN", "LTN", "LCY", "MAN", "EDI", "GLA", "BHX", "BRS", "NCL",
                        "LPL", "ABZ", "BFS",
                    ],
                    &[12],
                ),
                FestiveRegion::new(
                    "us",
                    &[
                        "JFK", "LAX", "ORD", "SFO", "ATL", "DFW", "DEN", "SEA", "MIA", "BOS", "EWR",
                        "IAD", "LAS", "PHX", "IAH", "MSP", "DTW", "PHL", "CLT", "MCO", "SAN",
                    ],
                    &[11],
                ),
            ],
            fallback_months: vec![11, 12],
        }
    }
}

impl FestivalCalendar {
    /// Flag for one row. `route_values` holds the row's value of every
    /// route-like column; `has_routes` is false when the table has none.
    pub fn flag(&self, month: Option<u32>, route_values: &[Option<&str>], has_routes: bool) -> bool {
        let Some(month) = month else {
            return false;
        };
        if !has_routes {
            return self.fallback_months.contains(&month);
        }
        route_values.iter().flatten().any(|value| {
            let upper = value.to_uppercase();
            self.regions.iter().any(|r| r.matches(&upper, month))
        })
    }
}
