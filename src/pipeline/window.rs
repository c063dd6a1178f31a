//! Pressure windows: a short buffer of barometer rows that a slider scrubs through.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::pipeline::aggregate;
use crate::pipeline::dataset::Dataset;
use crate::pipeline::time_range::TimeWindow;

/// Tolerance around the slider instant when picking a single pressure profile.
pub const PROFILE_HALF_WIDTH: Duration = Duration::milliseconds(500);

/// Rows with `cursor - half_width <= datetime < cursor + half_width`.
#[must_use]
pub fn window(dataset: &Dataset, cursor: NaiveDateTime, half_width: Duration) -> Dataset {
    let lower = cursor - half_width;
    let upper = cursor + half_width;
    dataset.filter_rows(|t| *t >= lower && *t < upper)
}

/// A fetched buffer plus the sensor value range over all of it.
///
/// Keeping the range of the whole buffer holds the chart's vertical axis
/// steady while the user moves through sub-windows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PressureWindow {
    pub span: TimeWindow,
    pub dataset: Dataset,
    pub minimum: f64,
    pub maximum: f64,
}

impl PressureWindow {
    #[must_use]
    pub fn new(span: TimeWindow, dataset: Dataset) -> Self {
        let (minimum, maximum) = aggregate::sensor_bounds(&dataset);
        Self {
            span,
            dataset,
            minimum,
            maximum,
        }
    }

    /// The rows around `offset` from the start of the buffer.
    #[must_use]
    pub fn profile_at(&self, offset: Duration) -> Dataset {
        window(&self.dataset, self.span.start + offset, PROFILE_HALF_WIDTH)
    }
}
