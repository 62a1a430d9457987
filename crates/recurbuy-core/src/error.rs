//! Error types for recurbuy-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid settings document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("Invalid allocation at index {index}: {reason}")]
    InvalidAllocation { index: usize, reason: String },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
