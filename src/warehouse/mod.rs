pub mod catalog;
pub mod client;
pub mod models;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::pipeline::dataset::Dataset;
use crate::pipeline::time_range::{MeasurementSession, TimeWindow};

pub use catalog::{Installation, SensorCoordinates, SensorType};
pub use client::BigQueryClient;

/// Queries the dashboard runs against the analytical warehouse.
///
/// `node_id` is optional everywhere; `None` means every node of the installation.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Minute-wise connection statistics: `datetime, filtered_rssi, raw_rssi,
    /// tx_power, allocated_heap_memory`.
    async fn connection_statistics(
        &self,
        installation_reference: &str,
        node_id: Option<&str>,
        window: TimeWindow,
    ) -> AppResult<Dataset>;

    /// The latest `row_limit` readings in `window`, ascending by time, with one
    /// positional `f<i>_` column per sensor.
    async fn sensor_data(
        &self,
        installation_reference: &str,
        node_id: Option<&str>,
        sensor_type_reference: &str,
        window: TimeWindow,
        row_limit: usize,
    ) -> AppResult<Dataset>;

    async fn installations(&self) -> AppResult<Vec<Installation>>;

    /// Node ids seen for an installation, sorted.
    async fn nodes(&self, installation_reference: &str) -> AppResult<Vec<String>>;

    async fn sensor_types(&self) -> AppResult<Vec<SensorType>>;

    async fn sensor_coordinates(&self) -> AppResult<Vec<SensorCoordinates>>;

    async fn measurement_sessions(
        &self,
        installation_reference: &str,
        node_id: Option<&str>,
        sensor_type_reference: &str,
    ) -> AppResult<Vec<MeasurementSession>>;
}
