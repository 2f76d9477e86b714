use thiserror::Error;

/// Errors from the PM schedule subsystem.
#[derive(Debug, Error)]
pub enum PmError {
    #[error("PM schedule not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Checklist JSON in a row failed to decode, or encoding failed on write.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rolling the due date forward left chrono's representable range.
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, PmError>;
