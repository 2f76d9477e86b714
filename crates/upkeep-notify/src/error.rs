use thiserror::Error;

/// Errors from the notification subsystem.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
