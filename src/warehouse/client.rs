use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::pipeline::dataset::Dataset;
use crate::pipeline::time_range::{MeasurementSession, TimeWindow};
use crate::warehouse::catalog::{Installation, SensorCoordinates, SensorType};
use crate::warehouse::models::{QueryParameter, QueryRequest, QueryResponse, ResultTable};
use crate::warehouse::Warehouse;

/// How long BigQuery may hold a `jobs.query` / `getQueryResults` call open.
const QUERY_TIMEOUT_MS: u64 = 60_000;

/// Give up polling an unfinished job after this many round trips.
const MAX_POLLS: usize = 30;

pub struct BigQueryClient {
    http_client: Client,
    base_url: String,
    project_id: String,
    dataset: String,
    access_token: String,
}

/// Reject anything that is not a plain identifier before it is spliced into a table name.
fn validate_identifier(value: &str) -> AppResult<&str> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(value)
    } else {
        Err(AppError::BadRequest(format!(
            "Invalid sensor type reference '{value}'"
        )))
    }
}

impl BigQueryClient {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.warehouse_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.warehouse_base_url.clone(),
            project_id: config.warehouse_project_id.clone(),
            dataset: config.warehouse_dataset.clone(),
            access_token: config.warehouse_access_token.clone(),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("`{}.{}`", self.dataset, name)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> AppResult<QueryResponse> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| AppError::Warehouse(format!("Request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::Warehouse("Rate limited (429)".to_string()));
        }

        if !response.status().is_success() {
            return Err(AppError::Warehouse(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| AppError::Warehouse(format!("Failed to parse response: {e}")))?;

        if let Some(error) = body.errors.first() {
            return Err(AppError::Warehouse(format!(
                "Query error ({}): {}",
                error.reason.as_deref().unwrap_or("unknown"),
                error.message.as_deref().unwrap_or_default()
            )));
        }

        Ok(body)
    }

    /// Run a parameterized query and collect every page of its result.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Warehouse` on transport, HTTP or query failures, or
    /// when the job does not finish in time.
    pub async fn query(&self, sql: String, parameters: Vec<QueryParameter>) -> AppResult<ResultTable> {
        let url = format!("{}/projects/{}/queries", self.base_url, self.project_id);
        let request = QueryRequest::new(sql, parameters, QUERY_TIMEOUT_MS);

        tracing::debug!(query = %request.query, "warehouse_query");
        let mut response = self.send(self.http_client.post(&url).json(&request)).await?;

        let mut fields = None;
        let mut rows = Vec::new();
        let mut polls = 0;

        loop {
            if response.job_complete {
                if fields.is_none() {
                    fields = response.schema.take().map(|s| s.fields);
                }
                rows.append(&mut response.rows);
                if response.page_token.is_none() {
                    break;
                }
            } else {
                polls += 1;
                if polls > MAX_POLLS {
                    return Err(AppError::Warehouse(
                        "Query did not complete in time".to_string(),
                    ));
                }
            }

            let job = response.job_reference.as_ref().ok_or_else(|| {
                AppError::Warehouse("Response has no job reference".to_string())
            })?;

            let mut params: Vec<(&str, String)> = vec![("timeoutMs", QUERY_TIMEOUT_MS.to_string())];
            if let Some(location) = &job.location {
                params.push(("location", location.clone()));
            }
            if let Some(token) = &response.page_token {
                params.push(("pageToken", token.clone()));
            }

            let results_url = format!(
                "{}/projects/{}/queries/{}",
                self.base_url, job.project_id, job.job_id
            );
            let job_reference = response.job_reference.clone();
            response = self
                .send(self.http_client.get(&results_url).query(&params))
                .await?;
            if response.job_reference.is_none() {
                response.job_reference = job_reference;
            }
        }

        tracing::debug!(rows = rows.len(), "warehouse_query_complete");

        Ok(ResultTable {
            fields: fields.unwrap_or_default(),
            rows,
        })
    }
}

#[async_trait]
impl Warehouse for BigQueryClient {
    async fn connection_statistics(
        &self,
        installation_reference: &str,
        node_id: Option<&str>,
        window: TimeWindow,
    ) -> AppResult<Dataset> {
        let sql = format!(
            "SELECT datetime, filtered_rssi, raw_rssi, tx_power, allocated_heap_memory
            FROM {}
            WHERE datetime BETWEEN @start AND @finish
            AND installation_reference = @installation_reference
            AND (@node_id IS NULL OR node_id = @node_id)
            ORDER BY datetime",
            self.table("connection_statistics_agg")
        );

        let table = self
            .query(
                sql,
                vec![
                    QueryParameter::string("installation_reference", Some(installation_reference)),
                    QueryParameter::string("node_id", node_id),
                    QueryParameter::datetime("start", window.start),
                    QueryParameter::datetime("finish", window.finish),
                ],
            )
            .await?;

        table.to_dataset()
    }

    async fn sensor_data(
        &self,
        installation_reference: &str,
        node_id: Option<&str>,
        sensor_type_reference: &str,
        window: TimeWindow,
        row_limit: usize,
    ) -> AppResult<Dataset> {
        let sensor_type = validate_identifier(sensor_type_reference)?;
        let sql = format!(
            "SELECT datetime, sensor_value
            FROM {}
            WHERE datetime BETWEEN @start AND @finish
            AND installation_reference = @installation_reference
            AND (@node_id IS NULL OR node_id = @node_id)
            ORDER BY datetime DESC
            LIMIT @row_limit",
            self.table(&format!("sensor_data_{sensor_type}"))
        );

        let table = self
            .query(
                sql,
                vec![
                    QueryParameter::string("installation_reference", Some(installation_reference)),
                    QueryParameter::string("node_id", node_id),
                    QueryParameter::datetime("start", window.start),
                    QueryParameter::datetime("finish", window.finish),
                    QueryParameter::int64(
                        "row_limit",
                        i64::try_from(row_limit).unwrap_or(i64::MAX),
                    ),
                ],
            )
            .await?;

        Ok(table.to_dataset()?.sorted_by_time())
    }

    async fn installations(&self) -> AppResult<Vec<Installation>> {
        let sql = format!(
            "SELECT reference, turbine_id, location FROM {} ORDER BY reference",
            self.table("installation")
        );
        let table = self.query(sql, Vec::new()).await?;

        Ok(table
            .rows
            .iter()
            .filter_map(|row| {
                Some(Installation {
                    reference: table.string(row, "reference")?,
                    turbine_id: table.string(row, "turbine_id"),
                    location: table.string(row, "location"),
                })
            })
            .collect())
    }

    async fn nodes(&self, installation_reference: &str) -> AppResult<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT node_id FROM {}
            WHERE installation_reference = @installation_reference
            AND node_id IS NOT NULL
            ORDER BY node_id",
            self.table("sensor_data")
        );
        let table = self
            .query(
                sql,
                vec![QueryParameter::string(
                    "installation_reference",
                    Some(installation_reference),
                )],
            )
            .await?;

        Ok(table
            .rows
            .iter()
            .filter_map(|row| table.string(row, "node_id"))
            .collect())
    }

    async fn sensor_types(&self) -> AppResult<Vec<SensorType>> {
        let sql = format!(
            "SELECT name, description, unit, variable FROM {} ORDER BY name",
            self.table("sensor_type")
        );
        let table = self.query(sql, Vec::new()).await?;

        Ok(table
            .rows
            .iter()
            .filter_map(|row| {
                Some(SensorType {
                    reference: table.string(row, "name")?,
                    description: table.string(row, "description"),
                    unit: table.string(row, "unit"),
                    variables: table.string_array(row, "variable"),
                })
            })
            .collect())
    }

    async fn sensor_coordinates(&self) -> AppResult<Vec<SensorCoordinates>> {
        let sql = format!(
            "SELECT reference, kind, xs, ys FROM {} ORDER BY reference",
            self.table("sensor_coordinates")
        );
        let table = self.query(sql, Vec::new()).await?;
        Ok(table.sensor_coordinates())
    }

    async fn measurement_sessions(
        &self,
        installation_reference: &str,
        node_id: Option<&str>,
        sensor_type_reference: &str,
    ) -> AppResult<Vec<MeasurementSession>> {
        let sql = format!(
            "SELECT start_time, finish_time FROM {}
            WHERE installation_reference = @installation_reference
            AND (@node_id IS NULL OR node_id = @node_id)
            AND sensor_type_reference = @sensor_type_reference
            ORDER BY start_time",
            self.table("session")
        );
        let table = self
            .query(
                sql,
                vec![
                    QueryParameter::string("installation_reference", Some(installation_reference)),
                    QueryParameter::string("node_id", node_id),
                    QueryParameter::string("sensor_type_reference", Some(sensor_type_reference)),
                ],
            )
            .await?;

        let start_index = table.index("start_time");
        let finish_index = table.index("finish_time");

        Ok(table
            .rows
            .iter()
            .filter_map(|row| {
                Some(MeasurementSession {
                    start: table.timestamp(row, start_index?)?,
                    finish: table.timestamp(row, finish_index?)?,
                })
            })
            .collect())
    }
}
