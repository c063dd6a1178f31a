use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Installation {
    pub reference: String,
    pub turbine_id: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SensorType {
    pub reference: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    /// Per-channel line descriptions, indexed by canonical sensor index
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SensorCoordinates {
    pub reference: String,
    pub kind: Option<String>,
    /// Chordwise coordinates, indexed by canonical sensor index
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

/// Sensor types that are not plotted on the sensors tab.
pub const EXCLUDED_SENSOR_TYPES: [&str; 3] = ["microphone", "connection_statistics", "battery_info"];

/// Columns offered on the information-sensors tab.
pub const INFORMATION_SENSORS: [&str; 5] = [
    "tx_power",
    "filtered_rssi",
    "raw_rssi",
    "allocated_heap_memory",
    "battery_info",
];

/// Information-sensor column read from its own sensor table instead of connection statistics.
pub const BATTERY_INFO: &str = "battery_info";

/// Sensor type holding the pressure taps.
pub const BAROMETER: &str = "barometer";
