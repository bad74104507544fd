use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{code}: {message}")]
    Backend { code: String, message: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Build a backend rejection from an opaque `(code, message)` pair.
    pub fn backend(code: impl Into<String>, message: impl Into<String>) -> Self {
        ClientError::Backend {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Error code as reported by the backend, or `"unknown"` for local failures.
    pub fn code(&self) -> &str {
        match self {
            ClientError::Backend { code, .. } => code,
            _ => "unknown",
        }
    }

    /// Text shown to the user in an alert. Backend messages pass through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Backend { message, .. } => message.clone(),
            ClientError::PermissionDenied(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Storage(format!("Serialization failed: {}", err))
    }
}

impl From<sqlx::migrate::MigrateError> for ClientError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        ClientError::Internal(format!("Migration failed: {}", err))
    }
}
