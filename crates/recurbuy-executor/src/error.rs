//! Engine error types.
//!
//! Only whole-run failures are errors. Per-allocation failures and floor skips are
//! recorded as outcomes in the run report.

use recurbuy_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to load allocation settings: {0}")]
    Settings(#[from] StoreError),

    #[error("Balance unavailable: {0}")]
    BalanceUnavailable(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("An execution run is already in progress")]
    RunInProgress,
}

impl EngineError {
    /// Label used for the run-result metric.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::Settings(_) => "settings_error",
            Self::BalanceUnavailable(_) => "balance_unavailable",
            Self::Timeout { .. } => "timeout",
            Self::RunInProgress => "in_progress",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
