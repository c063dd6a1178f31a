//! Time-range resolution and data shaping between the warehouse and the charts.

pub mod aggregate;
pub mod columns;
pub mod cp;
pub mod dataset;
pub mod guard;
pub mod time_range;
pub mod window;

pub use dataset::{Column, Dataset, DatasetError, DATETIME_COLUMN};
pub use guard::{fetch_with_limit, truncation_warning, Limited, ROW_LIMIT};
pub use time_range::{
    resolve, resolve_at, CustomBounds, CustomBoundsStatus, DateTimeParts, MeasurementSession,
    TimeRangeSelection, TimeWindow,
};
pub use window::{window, PressureWindow};
