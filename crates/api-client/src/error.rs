use core_types::CoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing or rejected API credential: {0}")]
    Authentication(String),

    #[error("Query execution failed: {0}")]
    RemoteFailure(String),

    #[error("Query did not complete within {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status} from {url}: {body}")]
    Http { status: u16, url: String, body: String },

    #[error("Failed to send the HTTP request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Failed to parse dataset: {0}")]
    Parse(#[from] CoreError),
}
