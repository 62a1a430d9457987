//! Management HTTP API.
//!
//! Routes:
//!
//! - `GET /api/allocations`: settings plus the live quote balance
//! - `POST /api/allocations`: replace the whole settings document
//! - `POST /api/executions`: run the engine now and return the report
//! - `OPTIONS` on both for cross-origin pre-flight
//! - `GET /health`, `GET /metrics`
//!
//! Every `/api` route requires a bearer token from the configured identity
//! provider whose email is on the allow-list.

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use server::{create_router, run_server};
pub use state::ApiState;
