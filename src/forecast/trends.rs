//! Calendar aggregates of the target

use super::result::ChartPoint;
use crate::feature_engineering::FeatureMatrix;
use std::collections::BTreeMap;

/// Bucket means over the kept rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trends {
    pub monthly: BTreeMap<u32, f64>,
    pub weekday: BTreeMap<u32, f64>,
    pub festive_avg: f64,
}

impl Trends {
    /// Rows without a calendar date are left out of the month and weekday
    /// buckets. `festive_avg` is 0 when no row is festive.
    pub fn aggregate(matrix: &FeatureMatrix) -> Self {
        let mut monthly: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        let mut weekday: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        let mut festive = (0.0, 0usize);

        for (i, &y) in matrix.y.iter().enumerate() {
            if let Some(parts) = matrix.rows.calendar[i] {
                accumulate(monthly.entry(parts.month).or_default(), y);
                accumulate(weekday.entry(parts.day_of_week).or_default(), y);
            }
            if matrix.rows.festival[i] {
                accumulate(&mut festive, y);
            }
        }

        Self {
            monthly: finish(monthly),
            weekday: finish(weekday),
            festive_avg: if festive.1 > 0 {
                festive.0 / festive.1 as f64
            } else {
                0.0
            },
        }
    }

    /// Monthly series in ascending month order
    pub fn chart_data(&self) -> Vec<ChartPoint> {
        self.monthly
            .iter()
            .map(|(&month, &value)| ChartPoint { month, value })
            .collect()
    }
}

fn accumulate(bucket: &mut (f64, usize), y: f64) {
    bucket.0 += y;
    bucket.1 += 1;
}

fn finish(buckets: BTreeMap<u32, (f64, usize)>) -> BTreeMap<u32, f64> {
    buckets
        .into_iter()
        .map(|(k, (sum, n))| (k, sum / n as f64))
        .collect()
}
