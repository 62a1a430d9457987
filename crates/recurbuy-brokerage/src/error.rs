//! Brokerage error types.

use thiserror::Error;

use crate::signer::{KeyError, SignerError};
use crate::wire::OrderRejection;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Signing error: {0}")]
    Signing(#[from] SignerError),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("{0}")]
    OrderRejected(OrderRejection),

    #[error("Currency not found in accounts: {0}")]
    CurrencyNotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
