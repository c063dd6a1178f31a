use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::pipeline::columns;
use crate::pipeline::dataset::Dataset;

/// Free-stream conditions used to normalise barometer readings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct FlowParameters {
    /// Air density (kg/m³)
    pub air_density: f64,
    /// Free-stream velocity (m/s)
    pub freestream_velocity: f64,
    /// Reference (static) pressure (Pa)
    pub reference_pressure: f64,
}

impl FlowParameters {
    /// Dynamic pressure `0.5 * rho * U²`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a non-positive density or zero velocity.
    pub fn dynamic_pressure(&self) -> AppResult<f64> {
        if self.air_density.is_nan() || self.air_density <= 0.0 {
            return Err(AppError::BadRequest(format!(
                "air_density must be positive, got {}",
                self.air_density
            )));
        }
        if self.freestream_velocity == 0.0 || !self.freestream_velocity.is_finite() {
            return Err(AppError::BadRequest(format!(
                "freestream_velocity must be non-zero, got {}",
                self.freestream_velocity
            )));
        }
        Ok(0.5 * self.air_density * self.freestream_velocity.powi(2))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CpPoint {
    /// Canonical barometer index
    pub sensor: usize,
    /// Chordwise position (barometer index when no coordinates match)
    pub position: f64,
    pub cp: Option<f64>,
}

/// Pressure coefficients for the first row of `profile`.
///
/// `positions` gives the chordwise coordinate of each barometer in canonical
/// order; it is only used when it has one entry per barometer.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the flow parameters are unusable.
pub fn cp_profile(
    profile: &Dataset,
    positions: Option<&[f64]>,
    flow: &FlowParameters,
) -> AppResult<Vec<CpPoint>> {
    let dynamic_pressure = flow.dynamic_pressure()?;

    let names = profile.column_names();
    let (raw_names, indices) = columns::normalize(&names);
    let positions = positions.filter(|p| p.len() == raw_names.len());

    let points = raw_names
        .iter()
        .zip(&indices)
        .enumerate()
        .map(|(i, (raw, &sensor))| {
            let pressure = profile
                .column(raw)
                .and_then(|c| c.values.first().copied().flatten());
            CpPoint {
                sensor,
                position: positions.map_or(sensor as f64, |p| p[i]),
                cp: pressure.map(|p| (p - flow.reference_pressure) / dynamic_pressure),
            }
        })
        .collect();

    Ok(points)
}
