//! API error types and their HTTP responses.
//!
//! Error bodies are plain text; success bodies are JSON.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: Missing authorization header")]
    MissingAuthorization,

    #[error("Unauthorized: Invalid token")]
    InvalidToken,

    #[error("Forbidden: You are not authorized to access this resource")]
    Forbidden,

    #[error("Invalid allocation data")]
    InvalidAllocationData,

    #[error("Execution already in progress")]
    RunInProgress,

    #[error("Error {action}: {message}")]
    Upstream {
        action: &'static str,
        message: String,
    },

    #[error("Error {action}: {message}")]
    Internal {
        action: &'static str,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingAuthorization | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::InvalidAllocationData => StatusCode::BAD_REQUEST,
            Self::RunInProgress => StatusCode::CONFLICT,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal { .. } | Self::InvalidConfig(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
