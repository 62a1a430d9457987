//! Brokerage gateway trait and a scriptable mock.
//!
//! The engine only sees `DynGateway`, so the REST client, the mock used in
//! tests and the dry-run gateway are interchangeable.

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use recurbuy_core::{AccountBalance, ClientOrderId, MarketBuyOrder};
use rust_decimal::Decimal;

use crate::error::{GatewayError, GatewayResult};
use crate::wire::OrderRejection;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub client_order_id: ClientOrderId,
    /// Brokerage-assigned id, when the response carries one.
    pub order_id: Option<String>,
}

/// Balance reads and market buys against the brokerage.
pub trait BrokerageGateway: Send + Sync {
    /// Available amount for `currency`. Absence of the currency is an error.
    fn available_balance<'a>(&'a self, currency: &'a str)
        -> BoxFuture<'a, GatewayResult<AccountBalance>>;

    /// Place one market buy. Any non-accepted outcome is an error.
    fn place_market_buy<'a>(
        &'a self,
        order: &'a MarketBuyOrder,
    ) -> BoxFuture<'a, GatewayResult<OrderAck>>;
}

/// Arc wrapper for gateway trait objects.
pub type DynGateway = Arc<dyn BrokerageGateway>;

/// Mock gateway for tests and dry runs.
#[derive(Debug)]
pub struct MockGateway {
    /// Balance returned by reads; `None` makes every read fail.
    balance: parking_lot::Mutex<Option<Decimal>>,
    /// Symbols whose orders are rejected.
    rejected: parking_lot::Mutex<HashSet<String>>,
    /// Delay applied before balance responses.
    balance_latency: parking_lot::Mutex<Option<Duration>>,
    /// Delay applied before order responses.
    order_latency: parking_lot::Mutex<Option<Duration>>,
    /// Recorded order attempts, accepted or not.
    orders: parking_lot::Mutex<Vec<MarketBuyOrder>>,
    balance_reads: AtomicUsize,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new(Decimal::ZERO)
    }
}

impl MockGateway {
    pub fn new(balance: Decimal) -> Self {
        Self {
            balance: parking_lot::Mutex::new(Some(balance)),
            rejected: parking_lot::Mutex::new(HashSet::new()),
            balance_latency: parking_lot::Mutex::new(None),
            order_latency: parking_lot::Mutex::new(None),
            orders: parking_lot::Mutex::new(Vec::new()),
            balance_reads: AtomicUsize::new(0),
        }
    }

    pub fn set_balance(&self, balance: Decimal) {
        *self.balance.lock() = Some(balance);
    }

    /// Make every subsequent balance read fail.
    pub fn fail_balance(&self) {
        *self.balance.lock() = None;
    }

    /// Reject every order for `symbol` (base asset, case-insensitive).
    pub fn reject_symbol(&self, symbol: &str) {
        self.rejected.lock().insert(symbol.trim().to_uppercase());
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.balance_latency.lock() = Some(latency);
        *self.order_latency.lock() = Some(latency);
    }

    /// Delay only order responses by `latency`.
    pub fn set_order_latency(&self, latency: Duration) {
        *self.order_latency.lock() = Some(latency);
    }

    /// Recorded order attempts in call order.
    pub fn orders(&self) -> Vec<MarketBuyOrder> {
        self.orders.lock().clone()
    }

    pub fn balance_reads(&self) -> usize {
        self.balance_reads.load(Ordering::SeqCst)
    }

    async fn simulate_latency(latency: Option<Duration>) {
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl BrokerageGateway for MockGateway {
    fn available_balance<'a>(
        &'a self,
        currency: &'a str,
    ) -> BoxFuture<'a, GatewayResult<AccountBalance>> {
        Box::pin(async move {
            self.balance_reads.fetch_add(1, Ordering::SeqCst);
            let latency = *self.balance_latency.lock();
            Self::simulate_latency(latency).await;

            let balance = *self.balance.lock();
            match balance {
                Some(available) => Ok(AccountBalance {
                    currency: currency.to_string(),
                    available,
                }),
                None => Err(GatewayError::HttpClient(
                    "simulated balance read failure".to_string(),
                )),
            }
        })
    }

    fn place_market_buy<'a>(
        &'a self,
        order: &'a MarketBuyOrder,
    ) -> BoxFuture<'a, GatewayResult<OrderAck>> {
        Box::pin(async move {
            self.orders.lock().push(order.clone());
            let latency = *self.order_latency.lock();
            Self::simulate_latency(latency).await;

            let base = order
                .product_id
                .split_once('-')
                .map_or(order.product_id.as_str(), |(base, _)| base);
            if self.rejected.lock().contains(base) {
                return Err(GatewayError::OrderRejected(OrderRejection {
                    error: "UNKNOWN_FAILURE_REASON".to_string(),
                    message: format!("simulated rejection for {}", order.product_id),
                    error_details: None,
                    preview_failure_reason: None,
                }));
            }

            Ok(OrderAck {
                client_order_id: order.client_order_id.clone(),
                order_id: Some(format!("mock-{}", order.client_order_id)),
            })
        })
    }
}
