use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid timestamp '{value}' in report {report_id}")]
    InvalidTimestamp { report_id: String, value: String },
    #[error("Invalid report: {0}")]
    InvalidReport(String),
    #[error("Feed error: {0}")]
    Feed(String),
    #[error("Not found: {0}")]
    NotFound(String),
}
