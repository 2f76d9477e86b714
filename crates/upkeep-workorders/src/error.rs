use thiserror::Error;

/// Errors from the work-order subsystem.
#[derive(Debug, Error)]
pub enum WorkOrderError {
    #[error("Work order not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Notes or activity-log JSON failed to encode/decode.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WorkOrderError>;
