//! Auth error types.
//!
//! None of these escape the validator: every error is folded into an
//! unauthenticated outcome.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingHeader,

    #[error("Authorization header does not use the Bearer scheme")]
    InvalidScheme,

    #[error("Bearer token is empty")]
    EmptyToken,

    #[error("Token header has no key id")]
    MissingKeyId,

    #[error("No signing key matches key id: {0}")]
    UnknownKey(String),

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("Key set retrieval failed: {0}")]
    KeyFetch(String),

    #[error("Token rejected: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;
