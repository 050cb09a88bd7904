use core_types::Table;
use serde::Deserialize;
use serde_json::{Map, Value};

// Field names follow the API's snake_case JSON, so no renaming is needed.

/// The response from `POST /query/{id}/execute`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteResponse {
    pub execution_id: String,
    #[serde(default)]
    pub state: ExecutionState,
}

/// Lifecycle state of a query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ExecutionState {
    #[serde(rename = "QUERY_STATE_PENDING")]
    Pending,
    #[serde(rename = "QUERY_STATE_EXECUTING")]
    Executing,
    #[serde(rename = "QUERY_STATE_COMPLETED")]
    Completed,
    #[serde(rename = "QUERY_STATE_FAILED")]
    Failed,
    #[serde(rename = "QUERY_STATE_CANCELLED")]
    Cancelled,
    #[serde(rename = "QUERY_STATE_EXPIRED")]
    Expired,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ExecutionState {
    /// States after which polling can never produce rows.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ExecutionState::Failed | ExecutionState::Cancelled | ExecutionState::Expired
        )
    }
}

/// The response from `GET /execution/{id}/results` and `GET /query/{id}/results`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionResponse {
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub state: ExecutionState,
    #[serde(default)]
    pub result: Option<ExecutionResult>,
    /// Either a plain message or an object with a `message` field.
    #[serde(default)]
    pub error: Option<Value>,
}

impl ExecutionResponse {
    /// A readable description of the reported failure.
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(Value::String(msg)) => msg.clone(),
            Some(Value::Object(obj)) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
            Some(other) => other.to_string(),
            None => "Unknown error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
    #[serde(default)]
    pub metadata: Option<ResultMetadata>,
}

impl ExecutionResult {
    /// Converts the rows into a table, keeping the API's column order.
    pub fn into_table(self) -> Table {
        let order = self.metadata.as_ref().map(|m| m.column_names.as_slice());
        Table::from_records(&self.rows, order)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultMetadata {
    #[serde(default)]
    pub column_names: Vec<String>,
}
