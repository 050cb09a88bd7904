use crate::auth::api_key_headers;
use crate::error::ApiError;
use async_trait::async_trait;
use configuration::QueryApiConfig;
use core_types::Table;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

mod auth;
pub mod error;
pub mod exports;
pub mod responses;

// --- Public API ---
pub use exports::{fetch_all_exports, fetch_export, CsvExportClient, ExportSource};
pub use responses::{ExecuteResponse, ExecutionResponse, ExecutionState};

/// The interface to a query service with execute-and-poll semantics.
/// Implemented over HTTP by [`DuneClient`]; tests substitute scripted fakes.
#[async_trait]
pub trait QueryApi: Send + Sync {
    /// Starts a fresh execution of a saved query and returns its execution id.
    async fn execute_query(&self, query_id: u64) -> Result<String, ApiError>;

    /// Fetches the current state (and rows, once complete) of an execution.
    async fn execution_results(&self, execution_id: &str) -> Result<ExecutionResponse, ApiError>;

    /// Fetches the most recent cached results of a saved query.
    async fn latest_results(&self, query_id: u64) -> Result<ExecutionResponse, ApiError>;
}

/// HTTP client for the query API.
#[derive(Clone)]
pub struct DuneClient {
    client: reqwest::Client,
    base_url: String,
}

impl DuneClient {
    /// Builds a client whose every request carries the API key.
    pub fn new(config: &QueryApiConfig, api_key: Option<&str>) -> Result<Self, ApiError> {
        let headers = api_key_headers(api_key)?;
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder, url: &str) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        check_status(status, url, &text)?;

        serde_json::from_str::<T>(&text).map_err(|e| {
            ApiError::Deserialization(format!("{e}. Original text: {text}"))
        })
    }
}

/// Maps a non-success status to the matching error.
pub(crate) fn check_status(status: StatusCode, url: &str, body: &str) -> Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Authentication(format!("{status} from {url}: {body}")));
    }
    Err(ApiError::Http {
        status: status.as_u16(),
        url: url.to_string(),
        body: body.to_string(),
    })
}

#[async_trait]
impl QueryApi for DuneClient {
    async fn execute_query(&self, query_id: u64) -> Result<String, ApiError> {
        let url = format!("{}/query/{}/execute", self.base_url, query_id);
        let response: ExecuteResponse = self.send(self.client.post(&url), &url).await?;
        tracing::debug!(query_id, execution_id = %response.execution_id, "Execution started.");
        Ok(response.execution_id)
    }

    async fn execution_results(&self, execution_id: &str) -> Result<ExecutionResponse, ApiError> {
        let url = format!("{}/execution/{}/results", self.base_url, execution_id);
        self.send(self.client.get(&url), &url).await
    }

    async fn latest_results(&self, query_id: u64) -> Result<ExecutionResponse, ApiError> {
        let url = format!("{}/query/{}/results", self.base_url, query_id);
        self.send(self.client.get(&url), &url).await
    }
}

/// How long to wait for an execution and how often to ask about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollSettings {
    pub fn from_config(config: &QueryApiConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            interval: Duration::from_secs(config.poll_interval_secs),
        }
    }

    /// Number of result polls before giving up.
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let attempts = self.timeout.as_millis() / self.interval.as_millis();
        u32::try_from(attempts).unwrap_or(u32::MAX)
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from_config(&QueryApiConfig::default())
    }
}

/// Executes a saved query and waits for its rows.
pub async fn fetch_query(api: &dyn QueryApi, query_id: u64, poll: &PollSettings) -> Result<Table, ApiError> {
    let execution_id = api.execute_query(query_id).await?;
    tracing::info!(query_id, %execution_id, "Executing query.");

    for attempt in 1..=poll.max_attempts() {
        tokio::time::sleep(poll.interval).await;
        let response = api.execution_results(&execution_id).await?;

        match response.state {
            ExecutionState::Completed => {
                let table = response.result.map(|r| r.into_table()).unwrap_or_default();
                tracing::info!(query_id, rows = table.len(), attempt, "Query completed.");
                return Ok(table);
            }
            state if state.is_failure() => {
                let message = response.error_message();
                tracing::error!(query_id, ?state, %message, "Query execution failed.");
                return Err(ApiError::RemoteFailure(message));
            }
            state => tracing::debug!(query_id, ?state, attempt, "Query still running."),
        }
    }

    tracing::warn!(query_id, timeout = ?poll.timeout, "Gave up waiting for query.");
    Err(ApiError::Timeout(poll.timeout))
}

/// Fetches the cached results of a saved query without re-executing it.
pub async fn fetch_latest(api: &dyn QueryApi, query_id: u64) -> Result<Table, ApiError> {
    let response = api.latest_results(query_id).await?;
    if response.state.is_failure() {
        return Err(ApiError::RemoteFailure(response.error_message()));
    }
    let table = response.result.map(|r| r.into_table()).unwrap_or_default();
    tracing::info!(query_id, rows = table.len(), "Loaded cached query results.");
    Ok(table)
}

/// Loads every dataset from the query API when a client is available,
/// otherwise from the CSV exports.
pub async fn load_all_data(
    api: Option<&dyn QueryApi>,
    queries: &BTreeMap<String, u64>,
    exports: &dyn ExportSource,
    datasets: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, Table>, ApiError> {
    let Some(api) = api else {
        tracing::info!("No query API client, falling back to CSV exports.");
        return Ok(fetch_all_exports(exports, datasets).await);
    };

    let mut tables = BTreeMap::new();
    for (name, &query_id) in queries {
        let table = fetch_latest(api, query_id).await?;
        tables.insert(name.clone(), table);
    }
    Ok(tables)
}
