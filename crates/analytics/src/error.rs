use configuration::error::ConfigError;
use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Could not find a suitable column; tried {candidates:?} and found no numeric fallback")]
    MissingColumn { candidates: Vec<String> },

    #[error("Failed to parse table data: {0}")]
    Parse(#[from] CoreError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Invalid scenario request: {0}")]
    InvalidScenario(String),

    #[error("Decimal overflow while computing {0}")]
    Overflow(&'static str),
}
