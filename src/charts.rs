//! Chart descriptions handed to the browser for drawing.
//!
//! A [`Figure`] is plain data: series of x/y values plus axis labels and an
//! optional fixed vertical range. The front end maps it onto its plotting
//! library; nothing here draws.

use chrono::NaiveDateTime;
use serde::Serialize;
use utoipa::ToSchema;

use crate::pipeline::columns;
use crate::pipeline::cp::CpPoint;
use crate::pipeline::dataset::Dataset;

pub const NO_DATA_MESSAGE: &str = "No data to plot.";
pub const NO_SESSION_MESSAGE: &str = "No measurement session selected.";

const TIME_AXIS_TITLE: &str = "Date/time";
const RAW_VALUE_TITLE: &str = "Raw value";
const BAROMETER_AXIS_TITLE: &str = "Barometer number";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Line,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum AxisValue {
    Time(NaiveDateTime),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Trace {
    pub name: String,
    pub kind: TraceKind,
    pub x: Vec<AxisValue>,
    pub y: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Figure {
    pub x_title: String,
    pub y_title: String,
    pub traces: Vec<Trace>,
    /// Fixed `[min, max]` for the vertical axis
    pub y_range: Option<[f64; 2]>,
    pub show_legend: bool,
    pub height: Option<u32>,
    /// Shown in place of data when there is nothing to draw
    pub message: Option<String>,
}

impl Figure {
    fn new(x_title: &str, y_title: &str, traces: Vec<Trace>) -> Self {
        Self {
            x_title: x_title.to_string(),
            y_title: y_title.to_string(),
            traces,
            y_range: None,
            show_legend: true,
            height: None,
            message: None,
        }
    }

    /// An empty time-series chart carrying a message.
    #[must_use]
    pub fn empty(message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::new(TIME_AXIS_TITLE, RAW_VALUE_TITLE, Vec::new())
        }
    }

    #[must_use]
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }
}

/// Human title for a column name: `"filtered_rssi"` becomes `"Filtered rssi"`.
#[must_use]
pub fn graph_title(column: &str) -> String {
    let words = column.split('_').collect::<Vec<_>>().join(" ").to_lowercase();
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn time_axis(dataset: &Dataset) -> Vec<AxisValue> {
    dataset.times().iter().copied().map(AxisValue::Time).collect()
}

/// A single connection-statistic column against time.
#[must_use]
pub fn connection_statistic_chart(dataset: &Dataset, column: &str) -> Figure {
    let traces = dataset
        .column(column)
        .map(|c| Trace {
            name: column.to_string(),
            kind: TraceKind::Line,
            x: time_axis(dataset),
            y: c.values.clone(),
        })
        .into_iter()
        .collect();

    Figure::new(TIME_AXIS_TITLE, RAW_VALUE_TITLE, traces)
}

/// One line per positional sensor column.
///
/// Lines are named by `line_descriptions[index]` where the sensor type
/// provides one, otherwise by the canonical index. A dataset with no sensor
/// columns yields a figure without traces.
#[must_use]
pub fn sensors_chart(dataset: &Dataset, line_descriptions: &[String]) -> Figure {
    let names = dataset.column_names();
    let (raw_names, indices) = columns::normalize(&names);
    let x = time_axis(dataset);

    let traces = raw_names
        .iter()
        .zip(indices)
        .filter_map(|(raw, index)| {
            let column = dataset.column(raw)?;
            let name = line_descriptions
                .get(index)
                .cloned()
                .unwrap_or_else(|| index.to_string());
            Some(Trace {
                name,
                kind: TraceKind::Line,
                x: x.clone(),
                y: column.values.clone(),
            })
        })
        .collect();

    Figure::new(TIME_AXIS_TITLE, RAW_VALUE_TITLE, traces)
}

/// Barometer readings of a single instant as bars plus a connecting line.
///
/// Uses the first row of `profile`; an empty profile is drawn as zeros so the
/// axes stay in place. The vertical axis is pinned to `[minimum, maximum]`.
#[must_use]
pub fn pressure_bar_chart(profile: &Dataset, minimum: f64, maximum: f64) -> Figure {
    let names = profile.column_names();
    let (raw_names, indices) = columns::normalize(&names);

    let x: Vec<AxisValue> = indices.iter().map(|&i| AxisValue::Number(i as f64)).collect();
    let y: Vec<Option<f64>> = raw_names
        .iter()
        .map(|raw| {
            if profile.is_empty() {
                Some(0.0)
            } else {
                profile.column(raw).and_then(|c| c.values[0])
            }
        })
        .collect();

    let traces = vec![
        Trace {
            name: RAW_VALUE_TITLE.to_string(),
            kind: TraceKind::Line,
            x: x.clone(),
            y: y.clone(),
        },
        Trace {
            name: RAW_VALUE_TITLE.to_string(),
            kind: TraceKind::Bar,
            x,
            y,
        },
    ];

    Figure {
        y_range: Some([minimum, maximum]),
        show_legend: false,
        ..Figure::new(BAROMETER_AXIS_TITLE, RAW_VALUE_TITLE, traces)
    }
}

/// Pressure coefficient against chordwise position.
#[must_use]
pub fn cp_chart(points: &[CpPoint]) -> Figure {
    let trace = Trace {
        name: "Cp".to_string(),
        kind: TraceKind::Line,
        x: points.iter().map(|p| AxisValue::Number(p.position)).collect(),
        y: points.iter().map(|p| p.cp).collect(),
    };

    Figure {
        show_legend: false,
        ..Figure::new("Chordwise position", "Cp", vec![trace])
    }
}
