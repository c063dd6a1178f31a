//! Column normalization, bounds, windowing and dataset shaping.
//!
//! Run with: cargo test --test pipeline_test

mod common;

use aerosense_dashboard::pipeline::aggregate::{extract_bounds, sensor_bounds};
use aerosense_dashboard::pipeline::columns::{canonical_index, normalize, raw_name};
use aerosense_dashboard::pipeline::window::{window, PressureWindow, PROFILE_HALF_WIDTH};
use aerosense_dashboard::pipeline::{Column, Dataset, DatasetError, TimeWindow};
use chrono::Duration;
use common::ts;

#[test]
fn normalize_keeps_positional_columns_in_order() {
    let (names, indices) = normalize(&["f0_", "f2_", "other", "f10_"]);
    assert_eq!(names, vec!["f0_", "f2_", "f10_"]);
    assert_eq!(indices, vec![0, 2, 10]);
}

#[test]
fn normalize_of_nothing_is_nothing() {
    let empty: [&str; 0] = [];
    assert_eq!(normalize(&empty), (Vec::new(), Vec::new()));
}

#[test]
fn near_miss_names_are_not_sensor_columns() {
    for name in ["f_", "f1", "F1_", "xf1_", "f1_x", "datetime", "f-1_"] {
        assert_eq!(canonical_index(name), None, "{name}");
    }
    assert_eq!(canonical_index("f007_"), Some(7));
    assert_eq!(raw_name(12), "f12_");
}

fn two_by_two() -> Dataset {
    Dataset::from_rows(
        &["f0_", "f1_"],
        vec![
            (ts("2024-01-01T00:00:00"), vec![Some(1.0), Some(5.0)]),
            (ts("2024-01-01T00:00:01"), vec![Some(3.0), Some(9.0)]),
        ],
    )
    .expect("rows are well formed")
}

#[test]
fn bounds_over_empty_dataset_are_zero() {
    assert_eq!(extract_bounds(&Dataset::default(), &["f0_"]), (0.0, 0.0));
    let no_columns: [&str; 0] = [];
    assert_eq!(extract_bounds(&two_by_two(), &no_columns), (0.0, 0.0));
}

#[test]
fn bounds_span_all_value_columns() {
    assert_eq!(extract_bounds(&two_by_two(), &["f0_", "f1_"]), (1.0, 9.0));
    assert_eq!(extract_bounds(&two_by_two(), &["f0_"]), (1.0, 3.0));
}

#[test]
fn bounds_skip_missing_and_nan_cells() {
    let dataset = Dataset::from_rows(
        &["f0_", "f1_", "rssi"],
        vec![
            (ts("2024-01-01T00:00:00"), vec![None, Some(f64::NAN), Some(-100.0)]),
            (ts("2024-01-01T00:00:01"), vec![Some(2.0), Some(4.0), Some(100.0)]),
        ],
    )
    .expect("rows are well formed");

    assert_eq!(extract_bounds(&dataset, &["f0_", "f1_"]), (2.0, 4.0));
    assert_eq!(sensor_bounds(&dataset), (2.0, 4.0));
}

#[test]
fn window_is_half_open() {
    let cursor = ts("2024-01-01T00:00:10");
    let dataset = Dataset::from_rows(
        &["f0_"],
        vec![
            (ts("2024-01-01T00:00:09.4"), vec![Some(0.0)]),
            (ts("2024-01-01T00:00:09.5"), vec![Some(1.0)]),
            (ts("2024-01-01T00:00:10"), vec![Some(2.0)]),
            (ts("2024-01-01T00:00:10.499"), vec![Some(3.0)]),
            (ts("2024-01-01T00:00:10.5"), vec![Some(4.0)]),
        ],
    )
    .expect("rows are well formed");

    let slice = window(&dataset, cursor, Duration::milliseconds(500));
    assert_eq!(
        slice.column("f0_").map(|c| c.values.clone()),
        Some(vec![Some(1.0), Some(2.0), Some(3.0)])
    );
}

#[test]
fn pressure_window_keeps_buffer_bounds_for_every_slice() {
    let start = ts("2024-01-01T00:00:00");
    let rows = (0..60)
        .map(|s| {
            let value = f64::from(s);
            (start + Duration::seconds(i64::from(s)), vec![Some(value), Some(-value)])
        })
        .collect();
    let dataset = Dataset::from_rows(&["f0_", "f1_"], rows).expect("rows are well formed");
    let buffer = PressureWindow::new(TimeWindow::new(start, start + Duration::seconds(60)), dataset);

    assert_eq!((buffer.minimum, buffer.maximum), (-59.0, 59.0));

    let profile = buffer.profile_at(Duration::seconds(30));
    assert_eq!(profile.len(), 1);
    assert_eq!(profile.row(0), Some(vec![Some(30.0), Some(-30.0)]));
    assert_eq!(PROFILE_HALF_WIDTH, Duration::milliseconds(500));
}

#[test]
fn mismatched_column_lengths_are_rejected() {
    let result = Dataset::new(
        vec![ts("2024-01-01T00:00:00")],
        vec![Column::new("f0_", vec![Some(1.0), Some(2.0)])],
    );
    assert_eq!(
        result,
        Err(DatasetError::LengthMismatch {
            column: "f0_".to_string(),
            expected: 1,
            found: 2,
        })
    );

    let rows = Dataset::from_rows(&["a", "b"], vec![(ts("2024-01-01T00:00:00"), vec![Some(1.0)])]);
    assert!(matches!(rows, Err(DatasetError::RowWidth { row: 0, .. })));
}

#[test]
fn sorting_and_tail_keep_latest_rows() {
    let dataset = Dataset::from_rows(
        &["f0_"],
        vec![
            (ts("2024-01-01T00:00:02"), vec![Some(2.0)]),
            (ts("2024-01-01T00:00:00"), vec![Some(0.0)]),
            (ts("2024-01-01T00:00:01"), vec![Some(1.0)]),
        ],
    )
    .expect("rows are well formed");

    let latest = dataset.sorted_by_time().tail(2);
    assert_eq!(latest.times(), &[ts("2024-01-01T00:00:01"), ts("2024-01-01T00:00:02")]);
    assert_eq!(dataset.tail(10).len(), 3);
}

#[test]
fn csv_export_uses_canonical_sensor_names() {
    let dataset = Dataset::from_rows(
        &["f0_", "battery", "f3_"],
        vec![
            (ts("2024-01-01T00:00:00"), vec![Some(1.5), Some(80.0), None]),
            (ts("2024-01-01T00:00:00.25"), vec![Some(2.0), Some(79.0), Some(-1.0)]),
        ],
    )
    .expect("rows are well formed");

    let csv = dataset
        .sensor_columns()
        .rename_sensor_columns()
        .to_csv()
        .expect("writes");
    let text = String::from_utf8(csv).expect("utf-8");

    assert_eq!(
        text,
        "datetime,0,3\n2024-01-01T00:00:00,1.5,\n2024-01-01T00:00:00.250,2,-1\n"
    );
}
