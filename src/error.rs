use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Crate-wide error type. Domain outcomes (exhausted pool, lost race,
/// degraded normalization) are ordinary values, not variants here — only
/// genuine failures go through `AppError`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Storage failure. Fatal to the operation, propagates to the caller.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed structured payload (queue messages, stored JSON columns).
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("config error: {0}")]
    Config(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        AppError::InvalidInput(what.into())
    }
}
