//! Recurring crypto purchase service.
//!
//! Wires the allocation store, brokerage gateway, execution engine and management
//! API together, and fires engine runs on a cron schedule.

pub mod app;
pub mod config;
pub mod error;
pub mod schedule;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use schedule::RunSchedule;
