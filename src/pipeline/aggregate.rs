use crate::pipeline::dataset::Dataset;

/// Global minimum and maximum across `value_columns`.
///
/// Missing cells, NaN and unknown column names are ignored. When no value is
/// left both bounds are `0.0`, so a degenerate chart can still be drawn.
#[must_use]
pub fn extract_bounds<S: AsRef<str>>(dataset: &Dataset, value_columns: &[S]) -> (f64, f64) {
    let mut values = value_columns
        .iter()
        .filter_map(|name| dataset.column(name.as_ref()))
        .flat_map(|column| column.values.iter().copied().flatten())
        .filter(|v| !v.is_nan())
        .peekable();

    if values.peek().is_none() {
        return (0.0, 0.0);
    }

    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
        (min.min(v), max.max(v))
    })
}

/// Bounds over every positional sensor column of `dataset`.
#[must_use]
pub fn sensor_bounds(dataset: &Dataset) -> (f64, f64) {
    let sensors = dataset.sensor_columns();
    extract_bounds(&sensors, &sensors.column_names())
}
