//! Store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings document error: {0}")]
    Document(#[from] recurbuy_core::CoreError),
}

pub type StoreResult<T> = Result<T, StoreError>;
