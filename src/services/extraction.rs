//! Trigger for the external measurement-session extraction service.
//!
//! The request is posted from a detached task. This is best-effort: the
//! result is never observed by the caller and is only logged.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct ExtractionRequest {
    pub installation_reference: String,
    #[serde(default)]
    pub node_id: Option<String>,
    pub sensor_type_reference: String,
}

pub struct SessionExtractor {
    http_client: Client,
    url: Option<String>,
}

impl SessionExtractor {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be built.
    pub fn new(url: Option<String>) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(EXTRACTION_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { http_client, url })
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Spawn the extraction call and return an id for correlating its log lines.
    ///
    /// Best-effort, result unobserved: the spawned task is never joined.
    /// `on_accepted` runs inside that task once the service answers with a
    /// success status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ServiceUnavailable` when no extraction URL is configured.
    pub fn trigger<F>(&self, request: ExtractionRequest, on_accepted: F) -> AppResult<Uuid>
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(url) = self.url.clone() else {
            return Err(AppError::ServiceUnavailable(
                "Session extraction is not configured".to_string(),
            ));
        };

        let id = Uuid::new_v4();
        let client = self.http_client.clone();

        tracing::info!(
            extraction_id = %id,
            installation = %request.installation_reference,
            node = ?request.node_id,
            sensor_type = %request.sensor_type_reference,
            "session_extraction_requested"
        );

        tokio::spawn(async move {
            match client.post(&url).json(&request).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(extraction_id = %id, status = %response.status(), "session_extraction_accepted");
                    on_accepted();
                }
                Ok(response) => {
                    tracing::warn!(extraction_id = %id, status = %response.status(), "session_extraction_rejected");
                }
                Err(e) => {
                    tracing::warn!(extraction_id = %id, error = %e, "session_extraction_failed");
                }
            }
        });

        Ok(id)
    }
}
