//! Wire types for the BigQuery REST API (`jobs.query` / `jobs.getQueryResults`)
//! and conversion of result rows into datasets.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::pipeline::columns;
use crate::pipeline::dataset::{Column, Dataset, DATETIME_COLUMN};
use crate::pipeline::time_range::parse_iso_datetime;
use crate::warehouse::catalog::SensorCoordinates;

/// Body of `POST /projects/{project}/queries`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub use_legacy_sql: bool,
    pub parameter_mode: String,
    pub query_parameters: Vec<QueryParameter>,
    pub timeout_ms: u64,
}

impl QueryRequest {
    #[must_use]
    pub fn new(query: String, query_parameters: Vec<QueryParameter>, timeout_ms: u64) -> Self {
        Self {
            query,
            use_legacy_sql: false,
            parameter_mode: "NAMED".to_string(),
            query_parameters,
            timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameter {
    pub name: String,
    pub parameter_type: ParameterType,
    pub parameter_value: ParameterValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterType {
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterValue {
    /// Omitted for SQL `NULL`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl QueryParameter {
    fn typed(name: &str, type_name: &str, value: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            parameter_type: ParameterType {
                type_name: type_name.to_string(),
            },
            parameter_value: ParameterValue { value },
        }
    }

    #[must_use]
    pub fn string(name: &str, value: Option<&str>) -> Self {
        Self::typed(name, "STRING", value.map(str::to_string))
    }

    #[must_use]
    pub fn datetime(name: &str, value: NaiveDateTime) -> Self {
        Self::typed(
            name,
            "DATETIME",
            Some(value.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        )
    }

    #[must_use]
    pub fn int64(name: &str, value: i64) -> Self {
        Self::typed(name, "INT64", Some(value.to_string()))
    }
}

/// Response of both `jobs.query` and `jobs.getQueryResults`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub job_complete: bool,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub mode: Option<String>,
}

impl TableFieldSchema {
    fn is_repeated(&self) -> bool {
        self.mode.as_deref() == Some("REPEATED")
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self.field_type.as_str(),
            "FLOAT" | "FLOAT64" | "INTEGER" | "INT64" | "NUMERIC" | "BIGNUMERIC"
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorProto {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// All rows of a finished query, with their schema.
#[derive(Debug, Clone)]
pub struct ResultTable {
    pub fields: Vec<TableFieldSchema>,
    pub rows: Vec<TableRow>,
}

fn scalar_str(value: &serde_json::Value) -> Option<&str> {
    value.as_str()
}

fn scalar_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn repeated(value: &serde_json::Value) -> impl Iterator<Item = &serde_json::Value> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .map(|item| item.get("v").unwrap_or(item))
}

impl ResultTable {
    #[must_use]
    pub fn index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    fn cell<'a>(&self, row: &'a TableRow, index: usize) -> Option<&'a serde_json::Value> {
        row.f.get(index).map(|c| &c.v).filter(|v| !v.is_null())
    }

    #[must_use]
    pub fn string(&self, row: &TableRow, name: &str) -> Option<String> {
        let index = self.index(name)?;
        self.cell(row, index).and_then(scalar_str).map(str::to_string)
    }

    #[must_use]
    pub fn float(&self, row: &TableRow, index: usize) -> Option<f64> {
        self.cell(row, index).and_then(scalar_f64)
    }

    #[must_use]
    pub fn float_array(&self, row: &TableRow, index: usize) -> Vec<Option<f64>> {
        self.cell(row, index)
            .map(|v| repeated(v).map(scalar_f64).collect())
            .unwrap_or_default()
    }

    /// Repeated float cell with every entry present, `None` if any entry is null.
    /// A missing or null cell is an empty array.
    #[must_use]
    pub fn complete_float_array(&self, row: &TableRow, index: usize) -> Option<Vec<f64>> {
        self.float_array(row, index).into_iter().collect()
    }

    /// Rows of the `sensor_coordinates` table.
    ///
    /// Coordinates are positional per barometer, so a set with a null entry is
    /// skipped rather than shifted.
    #[must_use]
    pub fn sensor_coordinates(&self) -> Vec<SensorCoordinates> {
        let xs_index = self.index("xs");
        let ys_index = self.index("ys");

        self.rows
            .iter()
            .filter_map(|row| {
                let reference = self.string(row, "reference")?;
                let floats = |index: Option<usize>| match index {
                    Some(i) => self.complete_float_array(row, i),
                    None => Some(Vec::new()),
                };
                let (Some(xs), Some(ys)) = (floats(xs_index), floats(ys_index)) else {
                    tracing::warn!(reference = %reference, "sensor_coordinates_incomplete");
                    return None;
                };
                Some(SensorCoordinates {
                    kind: self.string(row, "kind"),
                    reference,
                    xs,
                    ys,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn string_array(&self, row: &TableRow, name: &str) -> Vec<String> {
        self.index(name)
            .and_then(|index| self.cell(row, index))
            .map(|v| {
                repeated(v)
                    .filter_map(scalar_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Read a `DATETIME` (ISO string) or `TIMESTAMP` (epoch seconds) cell.
    #[must_use]
    pub fn timestamp(&self, row: &TableRow, index: usize) -> Option<NaiveDateTime> {
        let value = self.cell(row, index)?;
        if self.fields.get(index)?.field_type == "TIMESTAMP" {
            let seconds = scalar_f64(value)?;
            let micros = (seconds * 1_000_000.0).round() as i64;
            return DateTime::from_timestamp_micros(micros).map(|t| t.naive_utc());
        }
        scalar_str(value).and_then(parse_iso_datetime)
    }

    /// Convert the table into a dataset keyed on the `datetime` column.
    ///
    /// Numeric scalar columns keep their names. Repeated numeric columns are
    /// expanded into positional `f<i>_` columns, padding short arrays with
    /// missing values. Non-numeric columns are dropped.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Warehouse` when the time column is absent or a row's
    /// timestamp cannot be read.
    pub fn to_dataset(&self) -> AppResult<Dataset> {
        let time_index = self.index(DATETIME_COLUMN).ok_or_else(|| {
            AppError::Warehouse(format!("result has no '{DATETIME_COLUMN}' column"))
        })?;

        let times = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                self.timestamp(row, time_index).ok_or_else(|| {
                    AppError::Warehouse(format!("unreadable timestamp in row {i}"))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let mut data_columns = Vec::new();
        for (index, field) in self.fields.iter().enumerate() {
            if index == time_index || !field.is_numeric() {
                continue;
            }

            if field.is_repeated() {
                let arrays: Vec<Vec<Option<f64>>> =
                    self.rows.iter().map(|row| self.float_array(row, index)).collect();
                let width = arrays.iter().map(Vec::len).max().unwrap_or(0);
                for position in 0..width {
                    data_columns.push(Column::new(
                        columns::raw_name(position),
                        arrays
                            .iter()
                            .map(|values| values.get(position).copied().flatten())
                            .collect(),
                    ));
                }
            } else {
                data_columns.push(Column::new(
                    field.name.clone(),
                    self.rows.iter().map(|row| self.float(row, index)).collect(),
                ));
            }
        }

        Ok(Dataset::new(times, data_columns)?)
    }
}
