//! Brokerage REST wire formats.
//!
//! Field names follow the brokerage's snake_case JSON.

use std::fmt;

use recurbuy_core::MarketBuyOrder;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOrderRequest {
    pub client_order_id: String,
    pub product_id: String,
    pub side: String,
    pub order_configuration: OrderConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfiguration {
    pub market_market_ioc: MarketIoc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketIoc {
    pub quote_size: String,
}

impl From<&MarketBuyOrder> for CreateOrderRequest {
    fn from(order: &MarketBuyOrder) -> Self {
        Self {
            client_order_id: order.client_order_id.to_string(),
            product_id: order.product_id.clone(),
            side: order.side.to_string(),
            order_configuration: OrderConfiguration {
                market_market_ioc: MarketIoc {
                    quote_size: order.quote_size.clone(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrderResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub success_response: Option<OrderSuccess>,
    #[serde(default)]
    pub error_response: Option<OrderRejection>,
}

impl CreateOrderResponse {
    /// Order id from either the nested success object or the top level.
    pub fn order_id(&self) -> Option<String> {
        self.success_response
            .as_ref()
            .and_then(|s| s.order_id.clone())
            .or_else(|| self.order_id.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderSuccess {
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Structured order failure, surfaced verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrderRejection {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error_details: Option<String>,
    #[serde(default)]
    pub preview_failure_reason: Option<String>,
}

impl fmt::Display for OrderRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order failed: {} - {}", self.error, self.message)?;
        if let Some(details) = self.error_details.as_deref().filter(|d| !d.is_empty()) {
            write!(f, " Details: {details}")?;
        }
        if let Some(reason) = self
            .preview_failure_reason
            .as_deref()
            .filter(|r| !r.is_empty())
        {
            write!(f, " Preview Failure: {reason}")?;
        }
        Ok(())
    }
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountsResponse {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub currency: String,
    pub available_balance: Amount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Amount {
    pub value: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
}
