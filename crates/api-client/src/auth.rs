use crate::error::ApiError;
use reqwest::header::{HeaderMap, HeaderValue};

/// The header the query API reads its credential from.
pub(crate) const API_KEY_HEADER: &str = "X-Dune-API-Key";

/// Builds the default headers carrying the API key.
///
/// A missing, blank or non-ASCII key is an `Authentication` error so that it
/// surfaces before any request is sent.
pub(crate) fn api_key_headers(api_key: Option<&str>) -> Result<HeaderMap, ApiError> {
    let key = api_key.map(str::trim).filter(|k| !k.is_empty()).ok_or_else(|| {
        ApiError::Authentication("an API key is required for the query API".to_string())
    })?;

    let value = HeaderValue::from_str(key)
        .map_err(|e| ApiError::Authentication(format!("API key is not a valid header value: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(API_KEY_HEADER, value);
    Ok(headers)
}
