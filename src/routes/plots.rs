use axum::{
    extract::{Query, State},
    response::Response,
    Json,
};
use chrono::{Duration, NaiveDateTime};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::charts::{self, Figure, NO_DATA_MESSAGE, NO_SESSION_MESSAGE};
use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::pipeline::cp::{self, FlowParameters};
use crate::pipeline::dataset::Dataset;
use crate::pipeline::guard::{fetch_with_limit, truncation_warning, Limited};
use crate::pipeline::time_range::{
    self, CustomBounds, DateTimeParts, TimeRangeSelection, TimeWindow,
};
use crate::pipeline::window::PressureWindow;
use crate::routes::catalog::line_descriptions;
use crate::routes::{node_filter, PlotResponse};
use crate::services::cache::{self, PressureWindowKey};
use crate::warehouse::catalog::{BAROMETER, BATTERY_INFO, EXCLUDED_SENSOR_TYPES, INFORMATION_SENSORS};

const SENSORS_PLOT_HEIGHT: u32 = 800;

fn opt_to_string<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Selection inputs shared by the time-series tabs.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PlotQuery {
    pub installation_reference: String,
    /// Blank or omitted means every node of the installation
    pub node_id: Option<String>,
    /// Connection-statistic column (information sensors) or sensor type (sensors)
    pub y_axis: String,
    /// Time range label, e.g. "Last day" (default), "Custom", "Measurement session"
    pub time_range: Option<String>,
    /// Custom start date (YYYY-MM-DD)
    pub start_date: Option<String>,
    pub start_hour: Option<u32>,
    pub start_minute: Option<u32>,
    pub start_second: Option<u32>,
    /// Custom end date (YYYY-MM-DD)
    pub end_date: Option<String>,
    pub end_hour: Option<u32>,
    pub end_minute: Option<u32>,
    pub end_second: Option<u32>,
    /// "<start> to <finish>" as listed by the sessions endpoint
    pub measurement_session: Option<String>,
    /// Response format for the sensors tab: json (default) or csv
    pub format: Option<String>,
}

impl PlotQuery {
    fn node_id(&self) -> Option<&str> {
        node_filter(self.node_id.as_deref())
    }

    fn selection(&self) -> AppResult<TimeRangeSelection> {
        match self.time_range.as_deref() {
            None => Ok(TimeRangeSelection::default()),
            Some(label) => label.parse().map_err(AppError::BadRequest),
        }
    }

    fn custom_bounds(&self) -> CustomBounds {
        CustomBounds {
            start: DateTimeParts {
                date: self.start_date.clone(),
                hour: self.start_hour,
                minute: self.start_minute,
                second: self.start_second,
            },
            end: DateTimeParts {
                date: self.end_date.clone(),
                hour: self.end_hour,
                minute: self.end_minute,
                second: self.end_second,
            },
        }
    }

    /// `None` when a custom range is incomplete or the session is missing or malformed.
    fn window(&self) -> AppResult<Option<TimeWindow>> {
        let selection = self.selection()?;
        Ok(time_range::resolve(
            selection,
            &self.custom_bounds(),
            self.measurement_session.as_deref(),
        ))
    }

    /// Every input that affects the response, in a fixed order.
    fn cache_components(&self) -> Vec<String> {
        vec![
            self.installation_reference.clone(),
            self.node_id().unwrap_or_default().to_string(),
            self.y_axis.clone(),
            self.time_range.clone().unwrap_or_default(),
            self.start_date.clone().unwrap_or_default(),
            opt_to_string(self.start_hour),
            opt_to_string(self.start_minute),
            opt_to_string(self.start_second),
            self.end_date.clone().unwrap_or_default(),
            opt_to_string(self.end_hour),
            opt_to_string(self.end_minute),
            opt_to_string(self.end_second),
            self.measurement_session.clone().unwrap_or_default(),
        ]
    }

    fn cache_key(&self, prefix: &str, extra: &[&str]) -> String {
        let components = self.cache_components();
        let mut parts: Vec<&str> = components.iter().map(String::as_str).collect();
        parts.extend_from_slice(extra);
        cache::cache_key(prefix, &parts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFormat {
    Json,
    Csv,
}

impl DataFormat {
    fn parse(value: Option<&str>) -> AppResult<Self> {
        match value.map(str::to_lowercase).as_deref() {
            None | Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            Some(other) => Err(AppError::BadRequest(format!(
                "Unsupported format '{other}', expected json or csv"
            ))),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// Chart a capped fetch, attaching the truncation notice when the cap was hit.
fn limited_plot<F>(title: String, limited: &Limited<Dataset>, limit: usize, chart: F) -> PlotResponse
where
    F: FnOnce(&Dataset) -> Figure,
{
    if limited.data.is_empty() {
        return PlotResponse::empty(title, NO_DATA_MESSAGE);
    }
    PlotResponse {
        title,
        figure: chart(&limited.data),
        warning: limited.truncated.then(|| truncation_warning(limit)),
    }
}

/// Plot connection statistics or battery information over time
#[utoipa::path(
    get,
    path = "/api/plots/information-sensors",
    params(PlotQuery),
    responses(
        (status = 200, description = "Chart description", body = PlotResponse),
        (status = 400, description = "Invalid column or time range"),
        (status = 502, description = "Warehouse query failed"),
    ),
    tag = "plots"
)]
pub async fn information_sensors_plot(
    State(state): State<AppState>,
    Query(query): Query<PlotQuery>,
) -> AppResult<Response> {
    if !INFORMATION_SENSORS.contains(&query.y_axis.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unknown information sensor '{}'",
            query.y_axis
        )));
    }

    let cache_key = query.cache_key("information_sensors", &[]);
    if let Some(cached) = state.response_cache.get(&cache_key).await {
        tracing::debug!(cache_key = %cache_key, "cache_hit");
        return cache::cached_response(cached, true);
    }

    let title = charts::graph_title(&query.y_axis);
    let node_id = query.node_id();
    let limit = state.config.row_limit;

    let response = match query.window()? {
        None => PlotResponse::empty(title, NO_SESSION_MESSAGE),
        Some(window) if query.y_axis == BATTERY_INFO => {
            let limited = fetch_with_limit(limit, |cap| {
                state.warehouse.sensor_data(
                    &query.installation_reference,
                    node_id,
                    BATTERY_INFO,
                    window,
                    cap,
                )
            })
            .await?;
            let descriptions = line_descriptions(&state, BATTERY_INFO).await?;
            limited_plot(title, &limited, limit, |data| {
                charts::sensors_chart(data, &descriptions)
            })
        }
        Some(window) => {
            let dataset = state
                .warehouse
                .connection_statistics(&query.installation_reference, node_id, window)
                .await?;
            if dataset.is_empty() {
                PlotResponse::empty(title, NO_DATA_MESSAGE)
            } else {
                PlotResponse::new(
                    title,
                    charts::connection_statistic_chart(&dataset, &query.y_axis),
                )
            }
        }
    };

    cache::cache_and_respond(&state.response_cache, cache_key, &response).await
}

/// Plot raw sensor readings over time, or download them as CSV
///
/// The latest `ROW_LIMIT` readings of the range are returned; the response
/// carries a warning when that cap was reached.
#[utoipa::path(
    get,
    path = "/api/plots/sensors",
    params(PlotQuery),
    responses(
        (status = 200, description = "Chart description, or CSV when format=csv", body = PlotResponse),
        (status = 400, description = "Invalid sensor type, format or time range"),
        (status = 502, description = "Warehouse query failed"),
    ),
    tag = "plots"
)]
pub async fn sensors_plot(
    State(state): State<AppState>,
    Query(query): Query<PlotQuery>,
) -> AppResult<Response> {
    if EXCLUDED_SENSOR_TYPES.contains(&query.y_axis.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Sensor type '{}' is not plotted on the sensors tab",
            query.y_axis
        )));
    }
    let format = DataFormat::parse(query.format.as_deref())?;

    let cache_key = query.cache_key("sensors", &[format.as_str()]);
    if let Some(cached) = state.response_cache.get(&cache_key).await {
        tracing::debug!(cache_key = %cache_key, "cache_hit");
        return cache::cached_response(cached, true);
    }

    let limit = state.config.row_limit;
    let limited = match query.window()? {
        Some(window) => Some(
            fetch_with_limit(limit, |cap| {
                state.warehouse.sensor_data(
                    &query.installation_reference,
                    query.node_id(),
                    &query.y_axis,
                    window,
                    cap,
                )
            })
            .await?,
        ),
        None => None,
    };

    if format == DataFormat::Csv {
        let dataset = limited.map(|l| l.data).unwrap_or_default();
        let bytes = dataset
            .sensor_columns()
            .rename_sensor_columns()
            .to_csv()
            .map_err(|e| AppError::Internal(format!("Failed to write CSV: {e}")))?;
        return cache::store_and_respond(&state.response_cache, cache_key, bytes, "text/csv").await;
    }

    let title = charts::graph_title(&query.y_axis);
    let mut response = match limited {
        None => PlotResponse::empty(title, NO_SESSION_MESSAGE),
        Some(limited) => {
            let descriptions = line_descriptions(&state, &query.y_axis).await?;
            limited_plot(title, &limited, limit, |data| {
                charts::sensors_chart(data, &descriptions)
            })
        }
    };
    response.figure = response.figure.with_height(SENSORS_PLOT_HEIGHT);

    cache::cache_and_respond(&state.response_cache, cache_key, &response).await
}

/// Selection of one instant inside a pressure buffer.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PressureQuery {
    pub installation_reference: String,
    pub node_id: Option<String>,
    /// Buffer start date (YYYY-MM-DD)
    pub date: String,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Slider position in seconds from the buffer start
    #[serde(default)]
    pub time_delta: f64,
}

/// Selection of one instant plus the flow conditions used to normalise it.
#[derive(Debug, Deserialize, IntoParams)]
pub struct CpQuery {
    pub installation_reference: String,
    pub node_id: Option<String>,
    /// Buffer start date (YYYY-MM-DD)
    pub date: String,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Slider position in seconds from the buffer start
    #[serde(default)]
    pub time_delta: f64,
    /// Air density (kg/m³)
    pub air_density: f64,
    /// Free-stream velocity (m/s)
    pub freestream_velocity: f64,
    /// Reference pressure (Pa)
    #[serde(default)]
    pub reference_pressure: f64,
    /// Sensor coordinates reference supplying chordwise positions
    pub sensor_coordinates: Option<String>,
}

fn buffer_start(date: &str, hour: u32, minute: u32, second: u32) -> AppResult<NaiveDateTime> {
    let parts = DateTimeParts {
        date: Some(date.to_string()),
        hour: Some(hour),
        minute: Some(minute),
        second: Some(second),
    };
    parts
        .combine()
        .map_err(AppError::BadRequest)?
        .ok_or_else(|| AppError::BadRequest("Incomplete start date/time".to_string()))
}

fn slider_offset(time_delta: f64, window_seconds: i64) -> AppResult<Duration> {
    if !time_delta.is_finite() || time_delta < 0.0 || time_delta > window_seconds as f64 {
        return Err(AppError::BadRequest(format!(
            "time_delta must be between 0 and {window_seconds} seconds, got {time_delta}"
        )));
    }
    Ok(Duration::milliseconds((time_delta * 1000.0).round() as i64))
}

/// Fetch (once) the barometer buffer starting at `start`.
async fn pressure_window(
    state: &AppState,
    installation_reference: &str,
    node_id: Option<&str>,
    start: NaiveDateTime,
) -> AppResult<Arc<PressureWindow>> {
    let finish = start
        .checked_add_signed(Duration::seconds(state.config.pressure_window_seconds))
        .ok_or_else(|| AppError::BadRequest(format!("window start {start} is out of range")))?;
    let span = TimeWindow::new(start, finish);
    let key = PressureWindowKey {
        installation_reference: installation_reference.to_string(),
        node_id: node_id.map(str::to_string),
        start: span.start,
        finish: span.finish,
    };

    state
        .pressure_cache
        .get_or_try_insert(key, || async {
            let dataset = state
                .warehouse
                .sensor_data(
                    installation_reference,
                    node_id,
                    BAROMETER,
                    span,
                    state.config.row_limit,
                )
                .await?;
            tracing::info!(
                installation = %installation_reference,
                node = ?node_id,
                start = %span.start,
                finish = %span.finish,
                rows = dataset.len(),
                "pressure_window_fetched"
            );
            Ok(Arc::new(PressureWindow::new(span, dataset)))
        })
        .await
}

/// Plot the barometer readings at one slider position
///
/// A buffer of `PRESSURE_WINDOW_SECONDS` starting at the selected instant is
/// fetched once and re-sliced for every slider position.
#[utoipa::path(
    get,
    path = "/api/plots/pressure-profile",
    params(PressureQuery),
    responses(
        (status = 200, description = "Chart description", body = PlotResponse),
        (status = 400, description = "Invalid start time or slider position"),
        (status = 502, description = "Warehouse query failed"),
    ),
    tag = "plots"
)]
pub async fn pressure_profile_plot(
    State(state): State<AppState>,
    Query(query): Query<PressureQuery>,
) -> AppResult<Json<PlotResponse>> {
    let start = buffer_start(&query.date, query.hour, query.minute, query.second)?;
    let offset = slider_offset(query.time_delta, state.config.pressure_window_seconds)?;
    let node_id = node_filter(query.node_id.as_deref());

    let buffer = pressure_window(&state, &query.installation_reference, node_id, start).await?;
    let title = "Pressure profile".to_string();

    if buffer.dataset.is_empty() {
        return Ok(Json(PlotResponse::empty(title, NO_DATA_MESSAGE)));
    }

    let profile = buffer.profile_at(offset).sensor_columns();
    Ok(Json(PlotResponse::new(
        title,
        charts::pressure_bar_chart(&profile, buffer.minimum, buffer.maximum),
    )))
}

/// Plot the pressure coefficient distribution at one slider position
#[utoipa::path(
    get,
    path = "/api/plots/cp",
    params(CpQuery),
    responses(
        (status = 200, description = "Chart description", body = PlotResponse),
        (status = 400, description = "Invalid start time, slider position or flow parameters"),
        (status = 404, description = "Sensor coordinates not found"),
        (status = 502, description = "Warehouse query failed"),
    ),
    tag = "plots"
)]
pub async fn cp_plot(
    State(state): State<AppState>,
    Query(query): Query<CpQuery>,
) -> AppResult<Json<PlotResponse>> {
    let flow = FlowParameters {
        air_density: query.air_density,
        freestream_velocity: query.freestream_velocity,
        reference_pressure: query.reference_pressure,
    };
    flow.dynamic_pressure()?;

    let start = buffer_start(&query.date, query.hour, query.minute, query.second)?;
    let offset = slider_offset(query.time_delta, state.config.pressure_window_seconds)?;
    let node_id = node_filter(query.node_id.as_deref());

    let positions = match query.sensor_coordinates.as_deref() {
        Some(reference) => {
            let coordinates = state.warehouse.sensor_coordinates().await?;
            let entry = coordinates
                .into_iter()
                .find(|c| c.reference == reference)
                .ok_or_else(|| {
                    AppError::NotFound(format!("Sensor coordinates '{reference}' not found"))
                })?;
            Some(entry.xs)
        }
        None => None,
    };

    let buffer = pressure_window(&state, &query.installation_reference, node_id, start).await?;
    let title = "Pressure coefficient".to_string();

    let profile = buffer.profile_at(offset).sensor_columns();
    if profile.is_empty() {
        return Ok(Json(PlotResponse::empty(title, NO_DATA_MESSAGE)));
    }

    let points = cp::cp_profile(&profile, positions.as_deref(), &flow)?;
    Ok(Json(PlotResponse::new(title, charts::cp_chart(&points))))
}
