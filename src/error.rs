//! Error types for the scoring service and history store

use thiserror::Error;

/// Failure talking to the transaction store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("store task did not complete: {0}")]
    Task(String),
}

/// Failure while handling a scoring request.
///
/// Callers only ever see one uniform [`REQUEST_FAILED`](Self::REQUEST_FAILED)
/// response; the variant is kept for logging and metrics.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid transaction: {0}")]
    Validation(String),

    #[error("scoring failed: {0:#}")]
    Scoring(anyhow::Error),

    #[error("failed to persist transaction: {0}")]
    Persistence(#[from] StoreError),
}

impl ServiceError {
    /// Kind every variant is reported as to callers
    pub const REQUEST_FAILED: &'static str = "RequestFailed";

    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::Scoring(_) => "scoring",
            ServiceError::Persistence(_) => "persistence",
        }
    }
}
