//! Column-oriented table of warehouse results.
//!
//! Every dataset carries a single time column (`datetime` in the warehouse)
//! and any number of numeric value columns whose cells may be missing.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::pipeline::columns;

/// Name of the time column in every warehouse result.
pub const DATETIME_COLUMN: &str = "datetime";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DatasetError {
    #[error("column '{column}' has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    times: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl Dataset {
    /// Build a dataset from a time column and value columns of the same length.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::LengthMismatch` if any column length differs from the time column.
    pub fn new(times: Vec<NaiveDateTime>, columns: Vec<Column>) -> Result<Self, DatasetError> {
        for column in &columns {
            if column.values.len() != times.len() {
                return Err(DatasetError::LengthMismatch {
                    column: column.name.clone(),
                    expected: times.len(),
                    found: column.values.len(),
                });
            }
        }
        Ok(Self { times, columns })
    }

    /// Build a dataset from row-major data.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::RowWidth` if a row does not have one value per column name.
    pub fn from_rows<S: AsRef<str>>(
        column_names: &[S],
        rows: Vec<(NaiveDateTime, Vec<Option<f64>>)>,
    ) -> Result<Self, DatasetError> {
        let mut times = Vec::with_capacity(rows.len());
        let mut columns: Vec<Column> = column_names
            .iter()
            .map(|name| Column::new(name.as_ref(), Vec::with_capacity(rows.len())))
            .collect();

        for (i, (time, values)) in rows.into_iter().enumerate() {
            if values.len() != columns.len() {
                return Err(DatasetError::RowWidth {
                    row: i,
                    expected: columns.len(),
                    found: values.len(),
                });
            }
            times.push(time);
            for (column, value) in columns.iter_mut().zip(values) {
                column.values.push(value);
            }
        }

        Ok(Self { times, columns })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[must_use]
    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Values of row `index`, in column order.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<Vec<Option<f64>>> {
        if index >= self.len() {
            return None;
        }
        Some(self.columns.iter().map(|c| c.values[index]).collect())
    }

    /// Keep only the named columns, in the order given. Unknown names are skipped.
    #[must_use]
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let columns = names
            .iter()
            .filter_map(|name| self.column(name.as_ref()).cloned())
            .collect();
        Self {
            times: self.times.clone(),
            columns,
        }
    }

    /// Keep the rows whose timestamp satisfies `keep`.
    #[must_use]
    pub fn filter_rows<P>(&self, keep: P) -> Self
    where
        P: Fn(&NaiveDateTime) -> bool,
    {
        let indices: Vec<usize> = self
            .times
            .iter()
            .enumerate()
            .filter(|(_, t)| keep(t))
            .map(|(i, _)| i)
            .collect();
        self.take_rows(&indices)
    }

    /// Keep the last `n` rows.
    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        let start = self.len().saturating_sub(n);
        let indices: Vec<usize> = (start..self.len()).collect();
        self.take_rows(&indices)
    }

    fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            times: indices.iter().map(|&i| self.times[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), indices.iter().map(|&i| c.values[i]).collect()))
                .collect(),
        }
    }

    /// Order rows by ascending timestamp. The sort is stable.
    #[must_use]
    pub fn sorted_by_time(&self) -> Self {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.sort_by_key(|&i| self.times[i]);
        self.take_rows(&indices)
    }

    /// Keep only the positional sensor columns (`f<index>_`).
    #[must_use]
    pub fn sensor_columns(&self) -> Self {
        let names = self.column_names();
        let (raw_names, _) = columns::normalize(&names);
        self.select(&raw_names)
    }

    /// Rename positional sensor columns to their canonical sensor index.
    #[must_use]
    pub fn rename_sensor_columns(&self) -> Self {
        let mut renamed = self.clone();
        for column in &mut renamed.columns {
            if let Some(index) = columns::canonical_index(&column.name) {
                column.name = index.to_string();
            }
        }
        renamed
    }

    /// Write the dataset as CSV with a leading `datetime` column.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the CSV writer.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = vec![DATETIME_COLUMN.to_string()];
        header.extend(self.columns.iter().map(|c| c.name.clone()));
        writer.write_record(&header)?;

        for (i, time) in self.times.iter().enumerate() {
            let mut record = vec![time.format("%Y-%m-%dT%H:%M:%S%.f").to_string()];
            record.extend(
                self.columns
                    .iter()
                    .map(|c| c.values[i].map(|v| v.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }

        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}
