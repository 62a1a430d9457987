//! Execution engine.

use std::time::Instant;

use chrono::Utc;
use recurbuy_brokerage::DynGateway;
use recurbuy_core::{
    round_quote_amount, Allocation, AllocationOutcome, MarketBuyOrder, OutcomeStatus, RunReport,
    RunTermination, SkipReason,
};
use recurbuy_store::DynStore;
use recurbuy_telemetry::Metrics;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Runs the recurring purchase plan against the brokerage.
///
/// Runs on one engine never overlap: a run started while another is in flight
/// returns [`EngineError::RunInProgress`] without touching the store or brokerage.
/// Separate processes sharing one account are not coordinated.
pub struct ExecutionEngine {
    store: DynStore,
    gateway: DynGateway,
    config: EngineConfig,
    run_lock: Mutex<()>,
}

impl ExecutionEngine {
    pub fn new(store: DynStore, gateway: DynGateway, config: EngineConfig) -> Self {
        Self {
            store,
            gateway,
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one run.
    pub async fn run(&self) -> EngineResult<RunReport> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("Execution run requested while another run is in flight");
            Metrics::run_rejected(EngineError::RunInProgress.metric_label());
            return Err(EngineError::RunInProgress);
        };

        let clock = Instant::now();
        let result = self.execute().await;
        let elapsed = clock.elapsed().as_secs_f64();

        match &result {
            Ok(report) => {
                Metrics::run_finished(termination_label(report.termination), elapsed);
                info!(
                    termination = termination_label(report.termination),
                    placed = report.placed(),
                    skipped = report.skipped(),
                    failed = report.failed(),
                    initial_balance = ?report.initial_balance,
                    final_balance = ?report.final_balance,
                    elapsed_secs = elapsed,
                    "Execution run finished"
                );
            }
            Err(e) => {
                Metrics::run_finished(e.metric_label(), elapsed);
                error!(error = %e, elapsed_secs = elapsed, "Execution run aborted");
            }
        }

        result
    }

    /// Current available quote balance, bounded by the call timeout.
    pub async fn quote_balance(&self) -> EngineResult<Decimal> {
        let currency = self.config.quote_currency.as_str();
        match tokio::time::timeout(
            self.config.call_timeout(),
            self.gateway.available_balance(currency),
        )
        .await
        {
            Ok(Ok(balance)) => Ok(balance.available),
            Ok(Err(e)) => Err(EngineError::BalanceUnavailable(e.to_string())),
            Err(_) => Err(EngineError::BalanceUnavailable(format!(
                "balance read timed out after {}ms",
                self.config.call_timeout_ms
            ))),
        }
    }

    async fn execute(&self) -> EngineResult<RunReport> {
        let started_at = Utc::now();

        let settings = tokio::time::timeout(self.config.call_timeout(), self.store.load())
            .await
            .map_err(|_| EngineError::Timeout {
                operation: "settings load",
                timeout_ms: self.config.call_timeout_ms,
            })??;
        let floor = settings.minimum_usdc_balance;

        let active: Vec<&Allocation> = settings.active_allocations().collect();
        if active.is_empty() {
            info!("No active allocations, nothing to execute");
            return Ok(RunReport {
                started_at,
                finished_at: Utc::now(),
                termination: RunTermination::NoActiveAllocations,
                minimum_balance: floor,
                initial_balance: None,
                final_balance: None,
                outcomes: Vec::new(),
            });
        }

        // A missing reading must never count as sufficient.
        let initial = self.quote_balance().await?;
        Metrics::quote_balance(initial.to_f64().unwrap_or_default());
        info!(
            currency = %self.config.quote_currency,
            balance = %initial,
            minimum = %floor,
            active = active.len(),
            "Quote balance read"
        );

        if initial <= floor {
            warn!(
                balance = %initial,
                minimum = %floor,
                "Balance at or below minimum, skipping all allocations"
            );
            return Ok(RunReport {
                started_at,
                finished_at: Utc::now(),
                termination: RunTermination::BelowMinimum,
                minimum_balance: floor,
                initial_balance: Some(initial),
                final_balance: Some(initial),
                outcomes: Vec::new(),
            });
        }

        let mut available = initial;
        let mut outcomes = Vec::with_capacity(active.len());

        for allocation in active {
            let outcome = self.execute_allocation(allocation, &mut available, floor).await;
            Metrics::allocation_outcome(&outcome.symbol, outcome.label());
            outcomes.push(outcome);
        }

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            termination: RunTermination::Completed,
            minimum_balance: floor,
            initial_balance: Some(initial),
            final_balance: Some(available),
            outcomes,
        })
    }

    /// Evaluate one allocation against the running balance.
    ///
    /// `available` is decremented only when the order is accepted.
    async fn execute_allocation(
        &self,
        allocation: &Allocation,
        available: &mut Decimal,
        floor: Decimal,
    ) -> AllocationOutcome {
        let symbol = allocation.symbol.trim().to_uppercase();
        let amount = allocation.quote_amount;
        let outcome = |status| AllocationOutcome {
            symbol: symbol.clone(),
            quote_amount: amount,
            status,
        };

        if symbol.is_empty() || amount <= Decimal::ZERO {
            warn!(symbol = %symbol, amount = %amount, "Invalid allocation in settings document");
            return outcome(OutcomeStatus::Failed {
                error: format!("Invalid allocation: symbol '{symbol}', amount {amount}"),
            });
        }

        // Floor check and running balance use the size actually sent.
        let spend = round_quote_amount(amount);
        if spend <= Decimal::ZERO {
            warn!(symbol = %symbol, amount = %amount, "Allocation rounds to a zero order size");
            return outcome(OutcomeStatus::Failed {
                error: format!("Invalid allocation: amount {amount} rounds to 0.00"),
            });
        }

        let projected = *available - spend;
        if projected < floor {
            info!(
                symbol = %symbol,
                amount = %amount,
                available = %available,
                projected = %projected,
                minimum = %floor,
                "Skipping allocation, balance would drop below minimum"
            );
            return outcome(OutcomeStatus::Skipped {
                reason: SkipReason::InsufficientBalance,
                projected_balance: projected,
            });
        }

        let order = MarketBuyOrder::new(&symbol, &self.config.quote_currency, spend);
        debug!(
            product_id = %order.product_id,
            client_order_id = %order.client_order_id,
            quote_size = %order.quote_size,
            "Placing market buy"
        );

        match tokio::time::timeout(
            self.config.call_timeout(),
            self.gateway.place_market_buy(&order),
        )
        .await
        {
            Ok(Ok(ack)) => {
                *available = projected;
                info!(
                    symbol = %symbol,
                    amount = %amount,
                    order_id = ?ack.order_id,
                    balance_after = %projected,
                    "Order placed"
                );
                outcome(OutcomeStatus::Placed {
                    client_order_id: ack.client_order_id,
                    order_id: ack.order_id,
                    balance_after: projected,
                })
            }
            Ok(Err(e)) => {
                error!(symbol = %symbol, amount = %amount, error = %e, "Order failed");
                outcome(OutcomeStatus::Failed {
                    error: e.to_string(),
                })
            }
            Err(_) => {
                error!(
                    symbol = %symbol,
                    amount = %amount,
                    timeout_ms = self.config.call_timeout_ms,
                    "Order timed out"
                );
                outcome(OutcomeStatus::Failed {
                    error: format!("Order timed out after {}ms", self.config.call_timeout_ms),
                })
            }
        }
    }
}

fn termination_label(termination: RunTermination) -> &'static str {
    match termination {
        RunTermination::NoActiveAllocations => "no_active_allocations",
        RunTermination::BelowMinimum => "below_minimum",
        RunTermination::Completed => "completed",
    }
}
