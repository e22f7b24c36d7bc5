use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Caller-fixable: malformed draft, unknown champion, bad `top_n`.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record store unreachable or empty. Predictions fall back to neutral defaults.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Aggregator bug (e.g. a non-canonical pair key). Never corrected silently.
    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, AppError::DataUnavailable(_))
    }
}
