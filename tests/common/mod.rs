//! Shared fixtures: an in-memory warehouse and router helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use aerosense_dashboard::common::AppState;
use aerosense_dashboard::config::Config;
use aerosense_dashboard::error::{AppError, AppResult};
use aerosense_dashboard::pipeline::time_range::{MeasurementSession, TimeWindow};
use aerosense_dashboard::pipeline::Dataset;
use aerosense_dashboard::routes;
use aerosense_dashboard::warehouse::{Installation, SensorCoordinates, SensorType, Warehouse};

pub fn ts(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").expect("valid test timestamp")
}

/// Warehouse double serving fixed datasets and counting the queries it receives.
#[derive(Default)]
pub struct FakeWarehouse {
    pub connection_statistics: Dataset,
    pub sensor_data: HashMap<String, Dataset>,
    pub installations: Vec<Installation>,
    pub nodes: Vec<String>,
    pub sensor_types: Vec<SensorType>,
    pub sensor_coordinates: Vec<SensorCoordinates>,
    pub sessions: Vec<MeasurementSession>,
    pub fail: bool,
    pub queries: AtomicUsize,
}

impl FakeWarehouse {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_sensor_data(mut self, sensor_type: &str, dataset: Dataset) -> Self {
        self.sensor_data.insert(sensor_type.to_string(), dataset);
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn record(&self) -> AppResult<()> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Warehouse("HTTP 500: backend unavailable".to_string()));
        }
        Ok(())
    }
}

fn in_window(dataset: &Dataset, window: TimeWindow) -> Dataset {
    dataset.filter_rows(|t| *t >= window.start && *t <= window.finish)
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn connection_statistics(
        &self,
        _installation_reference: &str,
        _node_id: Option<&str>,
        window: TimeWindow,
    ) -> AppResult<Dataset> {
        self.record()?;
        Ok(in_window(&self.connection_statistics, window))
    }

    async fn sensor_data(
        &self,
        _installation_reference: &str,
        _node_id: Option<&str>,
        sensor_type_reference: &str,
        window: TimeWindow,
        row_limit: usize,
    ) -> AppResult<Dataset> {
        self.record()?;
        let dataset = self
            .sensor_data
            .get(sensor_type_reference)
            .map(|d| in_window(d, window))
            .unwrap_or_default();
        Ok(dataset.sorted_by_time().tail(row_limit))
    }

    async fn installations(&self) -> AppResult<Vec<Installation>> {
        self.record()?;
        Ok(self.installations.clone())
    }

    async fn nodes(&self, _installation_reference: &str) -> AppResult<Vec<String>> {
        self.record()?;
        Ok(self.nodes.clone())
    }

    async fn sensor_types(&self) -> AppResult<Vec<SensorType>> {
        self.record()?;
        Ok(self.sensor_types.clone())
    }

    async fn sensor_coordinates(&self) -> AppResult<Vec<SensorCoordinates>> {
        self.record()?;
        Ok(self.sensor_coordinates.clone())
    }

    async fn measurement_sessions(
        &self,
        _installation_reference: &str,
        _node_id: Option<&str>,
        _sensor_type_reference: &str,
    ) -> AppResult<Vec<MeasurementSession>> {
        self.record()?;
        Ok(self.sessions.clone())
    }
}

/// Configuration with the required variables set plus `overrides`.
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("WAREHOUSE_PROJECT_ID".to_string(), "test-project".to_string()),
        ("WAREHOUSE_ACCESS_TOKEN".to_string(), "test-token".to_string()),
    ]);
    for (name, value) in overrides {
        vars.insert((*name).to_string(), (*value).to_string());
    }
    Config::from_lookup(|name| vars.get(name).cloned()).expect("valid test configuration")
}

pub fn test_app(warehouse: Arc<FakeWarehouse>, overrides: &[(&str, &str)]) -> Router {
    let state = AppState::new(test_config(overrides), warehouse).expect("state builds");
    routes::build_router(state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is UTF-8")
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.expect("router responds");
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body is readable")
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    send(
        app,
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request"),
    )
    .await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> TestResponse {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request"),
    )
    .await
}
