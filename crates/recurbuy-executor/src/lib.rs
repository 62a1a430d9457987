//! Balance-aware recurring execution engine.
//!
//! One run loads the allocation settings, reads the quote balance once, then walks
//! the active allocations in document order against a simulated running balance:
//!
//! 1. no active allocations -> `NoActiveAllocations`, balance never read
//! 2. balance read fails -> `EngineError::BalanceUnavailable`, zero orders
//! 3. balance <= floor -> `BelowMinimum`, zero orders
//! 4. per allocation: `projected = available - amount`
//!    - `projected < floor` -> skipped, balance untouched
//!    - order accepted -> placed, `available = projected`
//!    - order failed -> failed, balance untouched, next allocation still evaluated

pub mod config;
pub mod engine;
pub mod error;

pub use config::EngineConfig;
pub use engine::ExecutionEngine;
pub use error::{EngineError, EngineResult};
