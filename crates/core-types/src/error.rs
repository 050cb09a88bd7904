use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Could not parse {kind} from value '{value}'")]
    Parse { kind: &'static str, value: String },

    #[error("Failed to read CSV data: {0}")]
    Csv(#[from] csv::Error),
}
