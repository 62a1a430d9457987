//! Execution outcomes for one engine run.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::order::ClientOrderId;

/// Why an allocation was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Placing the order would drop the running balance below the floor.
    InsufficientBalance,
}

/// Per-allocation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum OutcomeStatus {
    #[serde(rename_all = "camelCase")]
    Placed {
        client_order_id: ClientOrderId,
        /// Order id assigned by the brokerage, when reported.
        order_id: Option<String>,
        /// Simulated running balance after this order.
        balance_after: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    Skipped {
        reason: SkipReason,
        projected_balance: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationOutcome {
    pub symbol: String,
    pub quote_amount: Decimal,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl AllocationOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Placed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, OutcomeStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }

    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self.status {
            OutcomeStatus::Placed { .. } => "placed",
            OutcomeStatus::Skipped { .. } => "skipped",
            OutcomeStatus::Failed { .. } => "failed",
        }
    }
}

/// How a run ended. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunTermination {
    /// No active allocations; the balance was never read.
    NoActiveAllocations,
    /// Initial balance at or below the floor; no allocation was evaluated.
    BelowMinimum,
    /// Every active allocation was evaluated.
    Completed,
}

/// Result of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub termination: RunTermination,
    pub minimum_balance: Decimal,
    /// Balance read at the start of the run (None when it was never read).
    pub initial_balance: Option<Decimal>,
    /// Simulated balance after the last placed order.
    pub final_balance: Option<Decimal>,
    pub outcomes: Vec<AllocationOutcome>,
}

impl RunReport {
    pub fn placed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_placed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}
