use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::routes::node_filter;
use crate::services::cache;
use crate::services::extraction::ExtractionRequest;

#[derive(Debug, Serialize, ToSchema)]
pub struct ExtractionAccepted {
    /// Correlates the service's log lines for this extraction
    pub extraction_id: Uuid,
}

/// Ask the extraction service to find new measurement sessions
///
/// Returns immediately; the extraction runs in the background and its outcome
/// is not reported. Cached session lists for the installation are dropped
/// immediately and again when the service accepts the request.
#[utoipa::path(
    post,
    path = "/api/sessions/extract",
    request_body = ExtractionRequest,
    responses(
        (status = 202, description = "Extraction triggered", body = ExtractionAccepted),
        (status = 400, description = "Missing installation or sensor type"),
        (status = 503, description = "Extraction service not configured"),
    ),
    tag = "sessions"
)]
pub async fn extract_sessions(
    State(state): State<AppState>,
    Json(mut request): Json<ExtractionRequest>,
) -> AppResult<(StatusCode, Json<ExtractionAccepted>)> {
    if request.installation_reference.trim().is_empty()
        || request.sensor_type_reference.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "installation_reference and sensor_type_reference are required".to_string(),
        ));
    }
    request.node_id = node_filter(request.node_id.as_deref()).map(str::to_string);

    // Trailing separator so "inst" does not also match "inst2"
    let prefix = cache::cache_key("sessions", &[&request.installation_reference, ""]);

    // Dropped now and again once the service accepts, since listings made
    // while the call is in flight re-cache the old sessions.
    let response_cache = state.response_cache.clone();
    let accepted_prefix = prefix.clone();
    let extraction_id = state.extractor.trigger(request, move || {
        response_cache.invalidate_prefix(&accepted_prefix);
    })?;
    state.response_cache.invalidate_prefix(&prefix);

    Ok((StatusCode::ACCEPTED, Json(ExtractionAccepted { extraction_id })))
}
