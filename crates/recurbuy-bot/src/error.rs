//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error("Signing key error: {0}")]
    Key(#[from] recurbuy_brokerage::KeyError),

    #[error("Brokerage error: {0}")]
    Gateway(#[from] recurbuy_brokerage::GatewayError),

    #[error("Identity provider error: {0}")]
    Auth(#[from] recurbuy_auth::AuthError),

    #[error("Engine error: {0}")]
    Engine(#[from] recurbuy_executor::EngineError),

    #[error("API error: {0}")]
    Api(#[from] recurbuy_api::ApiError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] recurbuy_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
