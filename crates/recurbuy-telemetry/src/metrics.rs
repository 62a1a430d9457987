//! Prometheus metrics for the recurring buy service.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure means
//! duplicate metric names, a startup-time programming error. These panics only
//! occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Encoder, Gauge,
    Histogram, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Engine runs by result.
/// Labels: result (completed/no_active_allocations/below_minimum/balance_unavailable/settings_error/in_progress)
pub static RUNS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("recurbuy_runs_total", "Total engine runs by result", &["result"])
        .unwrap()
});

/// Per-allocation outcomes.
/// Labels: symbol, outcome (placed/skipped/failed)
pub static ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "recurbuy_orders_total",
        "Total allocation outcomes by symbol",
        &["symbol", "outcome"]
    )
    .unwrap()
});

/// Last quote balance read at the start of a run.
pub static QUOTE_BALANCE: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "recurbuy_quote_balance",
        "Available quote currency balance at the last run start"
    )
    .unwrap()
});

/// Wall-clock duration of engine runs.
pub static RUN_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "recurbuy_run_duration_seconds",
        "Engine run duration in seconds",
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
    )
    .unwrap()
});

/// Management API authorization decisions.
/// Labels: decision (missing_header/unauthenticated/forbidden/authorized)
pub static AUTH_DECISIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "recurbuy_auth_decisions_total",
        "Management API authorization decisions",
        &["decision"]
    )
    .unwrap()
});

/// Metrics helper.
pub struct Metrics;

impl Metrics {
    pub fn run_finished(result: &str, duration_secs: f64) {
        RUNS_TOTAL.with_label_values(&[result]).inc();
        RUN_DURATION_SECONDS.observe(duration_secs);
    }

    pub fn run_rejected(result: &str) {
        RUNS_TOTAL.with_label_values(&[result]).inc();
    }

    pub fn allocation_outcome(symbol: &str, outcome: &str) {
        ORDERS_TOTAL.with_label_values(&[symbol, outcome]).inc();
    }

    pub fn quote_balance(balance: f64) {
        QUOTE_BALANCE.set(balance);
    }

    pub fn auth_decision(decision: &str) {
        AUTH_DECISIONS_TOTAL.with_label_values(&[decision]).inc();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn encode() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_metrics_appear_in_encoding() {
        Metrics::run_finished("completed", 0.25);
        Metrics::allocation_outcome("BTC", "placed");
        Metrics::quote_balance(42.5);
        Metrics::auth_decision("authorized");

        let text = Metrics::encode().unwrap();
        assert!(text.contains("recurbuy_runs_total{result=\"completed\"}"));
        assert!(text.contains("recurbuy_orders_total{outcome=\"placed\",symbol=\"BTC\"}"));
        assert!(text.contains("recurbuy_quote_balance 42.5"));
        assert!(text.contains("recurbuy_auth_decisions_total{decision=\"authorized\"}"));
        assert!(text.contains("recurbuy_run_duration_seconds_bucket"));
    }
}
