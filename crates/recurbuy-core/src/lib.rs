//! Core domain types for the recurring buy service.
//!
//! This crate provides the types shared by every other crate:
//! - `AllocationSettings`, `Allocation`: the persisted purchase plan
//! - `AccountBalance`: a point-in-time balance read
//! - `MarketBuyOrder`, `ClientOrderId`: one order placement attempt
//! - `RunReport`, `AllocationOutcome`: the result of one engine run

pub mod allocation;
pub mod error;
pub mod order;
pub mod outcome;

pub use allocation::{AccountBalance, Allocation, AllocationSettings, AllocationSettingsView};
pub use error::{CoreError, Result};
pub use order::{format_quote_size, round_quote_amount, ClientOrderId, MarketBuyOrder, OrderSide};
pub use outcome::{AllocationOutcome, OutcomeStatus, RunReport, RunTermination, SkipReason};
