//! Engine configuration.

use std::time::Duration;

use serde::Deserialize;

fn default_quote_currency() -> String {
    "USDC".to_string()
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Currency spent by every allocation; also the balance read.
    #[serde(default = "default_quote_currency")]
    pub quote_currency: String,

    /// Upper bound for each external call (settings load, balance read, order).
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quote_currency: default_quote_currency(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl EngineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}
