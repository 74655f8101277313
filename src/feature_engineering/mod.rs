//! Feature engineering
//!
//! Calendar decomposition of the date axis, the festival-season flag and
//! bounded categorical encoding, assembled into a numeric [`FeatureMatrix`].

pub mod calendar;
pub mod encoding;
pub mod festival;
mod matrix;

pub use calendar::{CalendarAxis, CalendarParts, CALENDAR_FEATURES};
pub use encoding::{CategoricalEncoder, ColumnEncoding, EncodedColumn, MISSING_LEVEL};
pub use festival::{FestivalCalendar, FestiveRegion};
pub use matrix::{
    FeatureConfig, FeatureMatrix, FeatureMatrixBuilder, FeatureMeta, RowContext, FESTIVAL_FEATURE,
};
