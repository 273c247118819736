use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("malformed raised_amount_usd {value:?} in a funding round of {company_id}")]
    BadAmount { company_id: String, value: String },

    #[error("cannot resume: no valid JSON line found in '{path}'")]
    ResumeNoValidLine { path: String },

    #[error("cannot resume: '{path}' does not support tail reads: {source}")]
    ResumeUnsupported {
        path: String,
        source: std::io::Error,
    },

    #[error("company '{0}' not found in the entity table")]
    CompanyNotFound(String),
}

pub type Result<T> = std::result::Result<T, ExportError>;
