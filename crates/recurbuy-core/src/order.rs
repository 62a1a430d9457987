//! Order-related types and identifiers.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order side. Only market buys are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
        }
    }
}

/// Client order ID for idempotency at the brokerage.
///
/// CRITICAL: a fresh id is generated for every placement attempt and never
/// reused across retries, so the brokerage can never confuse two attempts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID (UUID v4).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ClientOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Round a quote amount to the two decimals actually sent (midpoint away from zero).
pub fn round_quote_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a quote amount with exactly two fractional digits.
pub fn format_quote_size(amount: Decimal) -> String {
    format!("{:.2}", round_quote_amount(amount))
}

/// A market buy spending a fixed quote amount on one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketBuyOrder {
    pub client_order_id: ClientOrderId,
    /// Trading pair, `"<SYMBOL>-<QUOTE>"`.
    pub product_id: String,
    pub side: OrderSide,
    /// Quote amount, already formatted to two decimals.
    pub quote_size: String,
}

impl MarketBuyOrder {
    /// Build an order with a freshly generated client order id.
    pub fn new(symbol: &str, quote_currency: &str, quote_amount: Decimal) -> Self {
        Self {
            client_order_id: ClientOrderId::new(),
            product_id: format!(
                "{}-{}",
                symbol.trim().to_uppercase(),
                quote_currency.trim().to_uppercase()
            ),
            side: OrderSide::Buy,
            quote_size: format_quote_size(quote_amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_client_order_id_unique() {
        let id1 = ClientOrderId::new();
        let id2 = ClientOrderId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_client_order_id_is_uuid() {
        let id = ClientOrderId::new();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_format_quote_size_two_decimals() {
        assert_eq!(format_quote_size(dec!(40)), "40.00");
        assert_eq!(format_quote_size(dec!(12.5)), "12.50");
        assert_eq!(format_quote_size(dec!(12.345)), "12.35");
        assert_eq!(format_quote_size(dec!(12.344)), "12.34");
        assert_eq!(format_quote_size(dec!(0.005)), "0.01");
    }

    #[test]
    fn test_round_quote_amount_matches_formatted_size() {
        assert_eq!(round_quote_amount(dec!(25.555)), dec!(25.56));
        assert_eq!(round_quote_amount(dec!(25.554)), dec!(25.55));
        assert_eq!(round_quote_amount(dec!(0.004)), Decimal::ZERO);
        assert_eq!(round_quote_amount(dec!(40)), dec!(40));
    }

    #[test]
    fn test_market_buy_order_product_id() {
        let order = MarketBuyOrder::new("btc", "USDC", dec!(25));
        assert_eq!(order.product_id, "BTC-USDC");
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.quote_size, "25.00");
    }

    #[test]
    fn test_each_order_gets_fresh_id() {
        let a = MarketBuyOrder::new("BTC", "USDC", dec!(1));
        let b = MarketBuyOrder::new("BTC", "USDC", dec!(1));
        assert_ne!(a.client_order_id, b.client_order_id);
    }
}
