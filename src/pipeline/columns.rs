use regex::Regex;
use std::sync::LazyLock;

/// Positional column names the warehouse gives to unnamed values: `f0_`, `f1_`, ...
static SENSOR_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^f(\d+)_$").expect("sensor column pattern is valid"));

/// Canonical sensor index encoded in a positional column name, if it is one.
#[must_use]
pub fn canonical_index(column_name: &str) -> Option<usize> {
    SENSOR_COLUMN
        .captures(column_name)
        .and_then(|captures| captures[1].parse().ok())
}

/// Positional column name for a sensor index.
#[must_use]
pub fn raw_name(index: usize) -> String {
    format!("f{index}_")
}

/// Split out the positional sensor columns and decode their indices.
///
/// Returns parallel vectors of the matching raw names and their canonical
/// indices, in input order. Non-matching names are dropped.
pub fn normalize<S: AsRef<str>>(column_names: &[S]) -> (Vec<String>, Vec<usize>) {
    column_names
        .iter()
        .filter_map(|name| {
            let name = name.as_ref();
            canonical_index(name).map(|index| (name.to_string(), index))
        })
        .unzip()
}
