use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpkeepError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UpkeepError {
    /// Short error code string included in JSON error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            UpkeepError::Config(_) => "CONFIG_ERROR",
            UpkeepError::AuthFailed(_) => "AUTH_FAILED",
            UpkeepError::AccessDenied { .. } => "ACCESS_DENIED",
            UpkeepError::NotFound { .. } => "NOT_FOUND",
            UpkeepError::Validation(_) => "VALIDATION_ERROR",
            UpkeepError::AlreadyExists(_) => "ALREADY_EXISTS",
            UpkeepError::Database(_) => "DATABASE_ERROR",
            UpkeepError::Serialization(_) => "SERIALIZATION_ERROR",
            UpkeepError::Io(_) => "IO_ERROR",
            UpkeepError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, UpkeepError>;
