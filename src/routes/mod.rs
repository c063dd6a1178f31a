pub mod catalog;
pub mod health;
pub mod plots;
pub mod sessions;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::{OpenApi, ToSchema};
use utoipa_scalar::{Scalar, Servable};

use crate::charts::Figure;
use crate::common::AppState;

/// A chart plus the notice shown above it.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlotResponse {
    pub title: String,
    pub figure: Figure,
    /// Truncation notice, if the row cap was reached
    pub warning: Option<String>,
}

impl PlotResponse {
    #[must_use]
    pub fn new(title: String, figure: Figure) -> Self {
        Self {
            title,
            figure,
            warning: None,
        }
    }

    #[must_use]
    pub fn empty(title: String, message: &str) -> Self {
        Self::new(title, Figure::empty(message))
    }
}

/// Treat a blank node selection as "all nodes".
pub(crate) fn node_filter(node_id: Option<&str>) -> Option<&str> {
    node_id.map(str::trim).filter(|n| !n.is_empty())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        catalog::list_time_ranges,
        catalog::list_installations,
        catalog::list_nodes,
        catalog::list_sessions,
        catalog::list_sensor_types,
        catalog::list_sensor_coordinates,
        plots::information_sensors_plot,
        plots::sensors_plot,
        plots::pressure_profile_plot,
        plots::cp_plot,
        sessions::extract_sessions,
    ),
    components(
        schemas(
            health::HealthResponse,
            catalog::TimeRangeOption,
            catalog::SessionResponse,
            crate::warehouse::Installation,
            crate::warehouse::SensorType,
            crate::warehouse::SensorCoordinates,
            PlotResponse,
            crate::charts::Figure,
            crate::charts::Trace,
            crate::charts::TraceKind,
            crate::charts::AxisValue,
            crate::services::extraction::ExtractionRequest,
            sessions::ExtractionAccepted,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "catalog", description = "Installations, nodes, sensor types and sessions"),
        (name = "plots", description = "Chart descriptions for the dashboard tabs"),
        (name = "sessions", description = "Measurement session extraction"),
    ),
    info(
        title = "Aerosense Dashboard API",
        description = "Chart data for wind turbine blade sensor installations",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let catalog_routes = Router::new()
        .route("/time-ranges", get(catalog::list_time_ranges))
        .route("/installations", get(catalog::list_installations))
        .route("/installations/{installation}/nodes", get(catalog::list_nodes))
        .route(
            "/installations/{installation}/sessions",
            get(catalog::list_sessions),
        )
        .route("/sensor-types", get(catalog::list_sensor_types))
        .route("/sensor-coordinates", get(catalog::list_sensor_coordinates));

    let plot_routes = Router::new()
        .route(
            "/plots/information-sensors",
            get(plots::information_sensors_plot),
        )
        .route("/plots/sensors", get(plots::sensors_plot))
        .route("/plots/pressure-profile", get(plots::pressure_profile_plot))
        .route("/plots/cp", get(plots::cp_plot));

    let session_routes = Router::new().route("/sessions/extract", post(sessions::extract_sessions));

    let api_routes = Router::new()
        .merge(catalog_routes)
        .merge(plot_routes)
        .merge(session_routes)
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1MB body limit

    let health_routes = Router::new().route("/healthz", get(health::healthz));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
