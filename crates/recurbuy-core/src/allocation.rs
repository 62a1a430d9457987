//! Allocation settings: the persisted recurring purchase plan.
//!
//! The settings document is replaced wholesale on every write. Two persisted
//! forms are accepted on read:
//!
//! ```text
//! {"minimumUsdcBalance": 10, "allocations": [{"symbol": "BTC", ...}]}   current
//! [{"Symbol": "BTC", "USDCAmount": 25, "IsActive": true}]                legacy
//! ```
//!
//! The legacy bare array carries an implicit zero floor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

fn default_active() -> bool {
    true
}

/// One recurring purchase: spend `quote_amount` of the quote currency on `symbol`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Base asset code (e.g. "BTC"), combined with the quote currency into a product id.
    #[serde(alias = "Symbol")]
    pub symbol: String,
    /// Amount of quote currency spent per execution.
    #[serde(
        rename = "usdcAmount",
        alias = "USDCAmount",
        alias = "quoteAmount",
        serialize_with = "rust_decimal::serde::arbitrary_precision::serialize"
    )]
    pub quote_amount: Decimal,
    /// Inactive allocations are kept in the document but never executed.
    #[serde(rename = "isActive", alias = "IsActive", default = "default_active")]
    pub is_active: bool,
}

impl Allocation {
    pub fn new(symbol: impl Into<String>, quote_amount: Decimal, is_active: bool) -> Self {
        Self {
            symbol: symbol.into(),
            quote_amount,
            is_active,
        }
    }
}

/// The full settings document.
///
/// `allocations` order is the execution order. Duplicate symbols are allowed and
/// processed as independent entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSettings {
    /// Reserve floor that must remain after every placed order.
    #[serde(
        default,
        alias = "MinimumUsdcBalance",
        serialize_with = "rust_decimal::serde::arbitrary_precision::serialize"
    )]
    pub minimum_usdc_balance: Decimal,
    #[serde(default, alias = "Allocations")]
    pub allocations: Vec<Allocation>,
}

impl AllocationSettings {
    pub fn new(minimum_usdc_balance: Decimal, allocations: Vec<Allocation>) -> Self {
        Self {
            minimum_usdc_balance,
            allocations,
        }
    }

    /// Parse a persisted or submitted settings document.
    ///
    /// Empty text and JSON `null` yield default settings. A bare array is read as
    /// the legacy form with a zero floor. The result is always normalized.
    pub fn from_document(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: serde_json::Value = serde_json::from_str(text)?;
        let settings = match value {
            serde_json::Value::Null => Self::default(),
            serde_json::Value::Array(_) => Self {
                minimum_usdc_balance: Decimal::ZERO,
                allocations: serde_json::from_value(value)?,
            },
            other => serde_json::from_value(other)?,
        };

        Ok(settings.normalized())
    }

    /// Clamp a negative floor to zero.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.minimum_usdc_balance.is_sign_negative() {
            self.minimum_usdc_balance = Decimal::ZERO;
        }
        self
    }

    /// Active allocations in document order.
    pub fn active_allocations(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.iter().filter(|a| a.is_active)
    }

    /// Check client-submitted content: non-empty symbols and positive amounts.
    pub fn validate(&self) -> Result<()> {
        for (index, allocation) in self.allocations.iter().enumerate() {
            if allocation.symbol.trim().is_empty() {
                return Err(CoreError::InvalidAllocation {
                    index,
                    reason: "symbol is empty".to_string(),
                });
            }
            if allocation.quote_amount <= Decimal::ZERO {
                return Err(CoreError::InvalidAllocation {
                    index,
                    reason: format!("amount {} is not positive", allocation.quote_amount),
                });
            }
        }
        Ok(())
    }
}

/// Settings as returned by the management API, with the live balance when known.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSettingsView {
    #[serde(flatten)]
    pub settings: AllocationSettings,
    #[serde(serialize_with = "rust_decimal::serde::arbitrary_precision_option::serialize")]
    pub current_usdc_balance: Option<Decimal>,
}

/// Available balance for one currency at the moment of the read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalance {
    pub currency: String,
    pub available: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_settings() -> AllocationSettings {
        AllocationSettings::new(
            dec!(10),
            vec![
                Allocation::new("BTC", dec!(40), true),
                Allocation::new("ETH", dec!(55.5), false),
                Allocation::new("SOL", dec!(10), true),
            ],
        )
    }

    #[test]
    fn test_round_trip_current_form() {
        let settings = sample_settings();
        let json = serde_json::to_string(&settings).unwrap();
        let parsed = AllocationSettings::from_document(&json).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_round_trip_keeps_full_decimal_precision() {
        let settings = AllocationSettings::new(
            dec!(10.123456789012345678),
            vec![Allocation::new("BTC", dec!(25.1234567890123456789), true)],
        );
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains(r#""minimumUsdcBalance":10.123456789012345678"#));
        assert!(json.contains(r#""usdcAmount":25.1234567890123456789"#));

        let parsed = AllocationSettings::from_document(&json).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let json = serde_json::to_string(&sample_settings()).unwrap();
        assert!(json.contains(r#""minimumUsdcBalance":10,"#));
        assert!(json.contains(r#""usdcAmount":55.5"#));
        assert!(json.contains(r#""isActive":false"#));
    }

    #[test]
    fn test_legacy_array_form_has_zero_floor() {
        let legacy = r#"[
            {"Symbol": "BTC", "USDCAmount": 25, "IsActive": true},
            {"symbol": "ETH", "usdcAmount": 12.5, "isActive": false}
        ]"#;
        let settings = AllocationSettings::from_document(legacy).unwrap();
        assert_eq!(settings.minimum_usdc_balance, Decimal::ZERO);
        assert_eq!(settings.allocations.len(), 2);
        assert_eq!(settings.allocations[0], Allocation::new("BTC", dec!(25), true));
        assert_eq!(settings.allocations[1], Allocation::new("ETH", dec!(12.5), false));
    }

    #[test]
    fn test_empty_and_null_documents_yield_defaults() {
        assert_eq!(
            AllocationSettings::from_document("").unwrap(),
            AllocationSettings::default()
        );
        assert_eq!(
            AllocationSettings::from_document("  \n").unwrap(),
            AllocationSettings::default()
        );
        assert_eq!(
            AllocationSettings::from_document("null").unwrap(),
            AllocationSettings::default()
        );
    }

    #[test]
    fn test_malformed_document_is_error() {
        assert!(matches!(
            AllocationSettings::from_document("{not json"),
            Err(CoreError::InvalidDocument(_))
        ));
        assert!(matches!(
            AllocationSettings::from_document("42"),
            Err(CoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_missing_is_active_defaults_to_true() {
        let doc = r#"{"allocations": [{"symbol": "BTC", "quoteAmount": 5}]}"#;
        let settings = AllocationSettings::from_document(doc).unwrap();
        assert!(settings.allocations[0].is_active);
        assert_eq!(settings.allocations[0].quote_amount, dec!(5));
    }

    #[test]
    fn test_negative_floor_is_clamped() {
        let doc = r#"{"minimumUsdcBalance": -5, "allocations": []}"#;
        let settings = AllocationSettings::from_document(doc).unwrap();
        assert_eq!(settings.minimum_usdc_balance, Decimal::ZERO);
    }

    #[test]
    fn test_active_allocations_preserve_order() {
        let settings = sample_settings();
        let symbols: Vec<&str> = settings
            .active_allocations()
            .map(|a| a.symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["BTC", "SOL"]);
    }

    #[test]
    fn test_validate_rejects_empty_symbol_and_non_positive_amount() {
        let empty_symbol =
            AllocationSettings::new(dec!(0), vec![Allocation::new("  ", dec!(1), true)]);
        assert!(matches!(
            empty_symbol.validate(),
            Err(CoreError::InvalidAllocation { index: 0, .. })
        ));

        let zero_amount = AllocationSettings::new(
            dec!(0),
            vec![
                Allocation::new("BTC", dec!(1), true),
                Allocation::new("ETH", dec!(0), true),
            ],
        );
        assert!(matches!(
            zero_amount.validate(),
            Err(CoreError::InvalidAllocation { index: 1, .. })
        ));

        assert!(sample_settings().validate().is_ok());
    }

    #[test]
    fn test_duplicate_symbols_are_kept() {
        let doc = r#"[{"symbol": "BTC", "usdcAmount": 5}, {"symbol": "BTC", "usdcAmount": 7}]"#;
        let settings = AllocationSettings::from_document(doc).unwrap();
        assert_eq!(settings.active_allocations().count(), 2);
    }

    #[test]
    fn test_view_includes_current_balance() {
        let view = AllocationSettingsView {
            settings: AllocationSettings::new(dec!(1), vec![]),
            current_usdc_balance: Some(dec!(123.45)),
        };
        let json = serde_json::to_string(&view).unwrap();
        assert_eq!(
            json,
            r#"{"minimumUsdcBalance":1,"allocations":[],"currentUsdcBalance":123.45}"#
        );

        let unknown = AllocationSettingsView {
            settings: AllocationSettings::default(),
            current_usdc_balance: None,
        };
        let json = serde_json::to_string(&unknown).unwrap();
        assert!(json.ends_with(r#""currentUsdcBalance":null}"#));
    }
}
