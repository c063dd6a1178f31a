use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::common::AppState;
use crate::error::AppResult;
use crate::pipeline::time_range::{MeasurementSession, TimeRangeSelection};
use crate::routes::node_filter;
use crate::services::cache;
use crate::warehouse::catalog::EXCLUDED_SENSOR_TYPES;
use crate::warehouse::SensorType;

#[derive(Debug, Serialize, ToSchema)]
pub struct TimeRangeOption {
    pub label: &'static str,
    /// Whether the custom start/end inputs apply
    pub custom_inputs: bool,
    /// Whether the measurement session selector applies
    pub session_input: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
    /// `"<start> to <finish>"`, accepted back as `measurement_session`
    pub label: String,
}

impl From<MeasurementSession> for SessionResponse {
    fn from(session: MeasurementSession) -> Self {
        Self {
            start: session.start,
            finish: session.finish,
            label: session.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SessionsQuery {
    pub node_id: Option<String>,
    pub sensor_type: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SensorTypesQuery {
    /// Include types that are not plotted on the sensors tab
    #[serde(default)]
    pub include_hidden: bool,
}

/// Sensor type catalog, shared by the catalog endpoint and the plot handlers.
pub(crate) async fn sensor_types(state: &AppState) -> AppResult<Arc<Vec<SensorType>>> {
    state
        .sensor_type_cache
        .get_or_try_insert((), || async {
            let types = state.warehouse.sensor_types().await?;
            tracing::debug!(count = types.len(), "sensor_types_loaded");
            Ok(Arc::new(types))
        })
        .await
}

/// Line descriptions of a sensor type, empty when the type is unknown.
pub(crate) async fn line_descriptions(state: &AppState, sensor_type: &str) -> AppResult<Vec<String>> {
    Ok(sensor_types(state)
        .await?
        .iter()
        .find(|t| t.reference == sensor_type)
        .map(|t| t.variables.clone())
        .unwrap_or_default())
}

/// List the time range selector options
#[utoipa::path(
    get,
    path = "/api/time-ranges",
    responses(
        (status = 200, description = "Time range options", body = Vec<TimeRangeOption>),
    ),
    tag = "catalog"
)]
pub async fn list_time_ranges() -> Json<Vec<TimeRangeOption>> {
    Json(
        TimeRangeSelection::ALL
            .iter()
            .map(|s| TimeRangeOption {
                label: s.label(),
                custom_inputs: s.enables_custom_inputs(),
                session_input: s.enables_session_input(),
            })
            .collect(),
    )
}

/// List all installations
#[utoipa::path(
    get,
    path = "/api/installations",
    responses(
        (status = 200, description = "Installations retrieved successfully", body = Vec<crate::warehouse::Installation>),
        (status = 502, description = "Warehouse query failed"),
    ),
    tag = "catalog"
)]
pub async fn list_installations(State(state): State<AppState>) -> AppResult<Response> {
    let cache_key = cache::cache_key("installations", &[]);
    if let Some(cached) = state.response_cache.get(&cache_key).await {
        tracing::debug!(cache_key = %cache_key, "cache_hit");
        return cache::cached_response(cached, true);
    }

    let installations = state.warehouse.installations().await?;
    cache::cache_and_respond(&state.response_cache, cache_key, &installations).await
}

/// List the node ids of an installation
///
/// The first node is the dashboard's default selection.
#[utoipa::path(
    get,
    path = "/api/installations/{installation}/nodes",
    params(
        ("installation" = String, Path, description = "Installation reference"),
    ),
    responses(
        (status = 200, description = "Node ids retrieved successfully", body = Vec<String>),
        (status = 502, description = "Warehouse query failed"),
    ),
    tag = "catalog"
)]
pub async fn list_nodes(
    State(state): State<AppState>,
    Path(installation): Path<String>,
) -> AppResult<Response> {
    let cache_key = cache::cache_key("nodes", &[&installation]);
    if let Some(cached) = state.response_cache.get(&cache_key).await {
        return cache::cached_response(cached, true);
    }

    let nodes = state.warehouse.nodes(&installation).await?;
    cache::cache_and_respond(&state.response_cache, cache_key, &nodes).await
}

/// List the measurement sessions recorded for an installation, node and sensor type
#[utoipa::path(
    get,
    path = "/api/installations/{installation}/sessions",
    params(
        ("installation" = String, Path, description = "Installation reference"),
        SessionsQuery
    ),
    responses(
        (status = 200, description = "Sessions retrieved successfully", body = Vec<SessionResponse>),
        (status = 502, description = "Warehouse query failed"),
    ),
    tag = "catalog"
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(installation): Path<String>,
    Query(query): Query<SessionsQuery>,
) -> AppResult<Response> {
    let node_id = node_filter(query.node_id.as_deref());
    let cache_key = cache::cache_key(
        "sessions",
        &[&installation, node_id.unwrap_or_default(), &query.sensor_type],
    );
    if let Some(cached) = state.response_cache.get(&cache_key).await {
        return cache::cached_response(cached, true);
    }

    let sessions: Vec<SessionResponse> = state
        .warehouse
        .measurement_sessions(&installation, node_id, &query.sensor_type)
        .await?
        .into_iter()
        .map(SessionResponse::from)
        .collect();

    cache::cache_and_respond(&state.response_cache, cache_key, &sessions).await
}

/// List sensor types
///
/// Types that are not plotted on the sensors tab (microphone, connection
/// statistics, battery info) are left out unless `include_hidden` is set.
#[utoipa::path(
    get,
    path = "/api/sensor-types",
    params(SensorTypesQuery),
    responses(
        (status = 200, description = "Sensor types retrieved successfully", body = Vec<SensorType>),
        (status = 502, description = "Warehouse query failed"),
    ),
    tag = "catalog"
)]
pub async fn list_sensor_types(
    State(state): State<AppState>,
    Query(query): Query<SensorTypesQuery>,
) -> AppResult<Json<Vec<SensorType>>> {
    let types = sensor_types(&state).await?;
    let visible = types
        .iter()
        .filter(|t| query.include_hidden || !EXCLUDED_SENSOR_TYPES.contains(&t.reference.as_str()))
        .cloned()
        .collect();
    Ok(Json(visible))
}

/// List sensor coordinate sets
#[utoipa::path(
    get,
    path = "/api/sensor-coordinates",
    responses(
        (status = 200, description = "Sensor coordinates retrieved successfully", body = Vec<crate::warehouse::SensorCoordinates>),
        (status = 502, description = "Warehouse query failed"),
    ),
    tag = "catalog"
)]
pub async fn list_sensor_coordinates(State(state): State<AppState>) -> AppResult<Response> {
    let cache_key = cache::cache_key("sensor_coordinates", &[]);
    if let Some(cached) = state.response_cache.get(&cache_key).await {
        return cache::cached_response(cached, true);
    }

    let coordinates = state.warehouse.sensor_coordinates().await?;
    cache::cache_and_respond(&state.response_cache, cache_key, &coordinates).await
}
