//! Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use recurbuy_api::ApiConfig;
use recurbuy_auth::IdentityConfig;
use recurbuy_brokerage::{KeySource, DEFAULT_API_BASE};
use recurbuy_executor::EngineConfig;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::schedule::RunSchedule;

/// Environment variable overriding `brokerage.api_key_name`.
pub const ENV_API_KEY_NAME: &str = "RECURBUY_API_KEY_NAME";
/// Environment variable overriding `identity.authorized_users`.
pub const ENV_AUTHORIZED_USERS: &str = "RECURBUY_AUTHORIZED_USERS";
/// Environment variable overriding `api.allowed_origin`.
pub const ENV_ALLOWED_ORIGIN: &str = "RECURBUY_ALLOWED_ORIGIN";

/// Brokerage connection and credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerageConfig {
    /// REST base URL including the `/api/v3/brokerage` prefix.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// API key name, the `kid` and `sub` of every signed request.
    #[serde(default)]
    pub api_key_name: String,
    /// Where the EC private key PEM is read from.
    #[serde(default)]
    pub private_key: KeySource,
    /// Per-request HTTP timeout (seconds).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for BrokerageConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key_name: String::new(),
            private_key: KeySource::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BrokerageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings document location.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/allocations.json")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// When scheduled runs fire.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Six-field cron expression, UTC.
    #[serde(default = "default_cron")]
    pub cron: String,
    /// Run once immediately at startup, before the first scheduled time.
    #[serde(default)]
    pub run_on_startup: bool,
}

fn default_cron() -> String {
    "0 0 9 * * *".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            run_on_startup: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
        }
    }
}

/// Simulated brokerage for rehearsals: orders are recorded, never sent.
#[derive(Debug, Clone, Deserialize)]
pub struct DryRunConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Quote balance reported by the simulated brokerage.
    #[serde(default = "default_dry_run_balance")]
    pub balance: Decimal,
}

fn default_dry_run_balance() -> Decimal {
    Decimal::from(1000)
}

impl Default for DryRunConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            balance: default_dry_run_balance(),
        }
    }
}

/// Full service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub brokerage: BrokerageConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub dry_run: DryRunConfig,
}

impl AppConfig {
    /// Load from a TOML file, then apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file without overrides.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Replace secrets and deployment-specific values from `lookup` (normally the
    /// process environment). Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key_name) = value(ENV_API_KEY_NAME) {
            self.brokerage.api_key_name = key_name;
        }
        if let Some(users) = value(ENV_AUTHORIZED_USERS) {
            self.identity.authorized_users = users;
        }
        if let Some(origin) = value(ENV_ALLOWED_ORIGIN) {
            self.api.allowed_origin = origin;
        }
    }

    /// Check values that would otherwise only fail at first use.
    pub fn validate(&self) -> AppResult<()> {
        RunSchedule::parse(&self.schedule.cron)?;

        if self.engine.quote_currency.trim().is_empty() {
            return Err(AppError::Config("engine.quote_currency is empty".to_string()));
        }
        if self.engine.call_timeout_ms == 0 {
            return Err(AppError::Config("engine.call_timeout_ms must be positive".to_string()));
        }
        if self.api.enabled && self.identity.audience.trim().is_empty() {
            return Err(AppError::Config(
                "identity.audience is required when the API is enabled".to_string(),
            ));
        }
        if self.dry_run.balance.is_sign_negative() {
            return Err(AppError::Config("dry_run.balance is negative".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.brokerage.api_base, DEFAULT_API_BASE);
        assert_eq!(config.brokerage.timeout(), Duration::from_secs(10));
        assert_eq!(config.store.path, PathBuf::from("data/allocations.json"));
        assert_eq!(config.schedule.cron, "0 0 9 * * *");
        assert!(!config.schedule.run_on_startup);
        assert_eq!(config.engine.quote_currency, "USDC");
        assert_eq!(config.api.port, 7071);
        assert_eq!(config.identity.leeway_secs, 300);
        assert_eq!(config.telemetry.log_filter, "info");
        assert!(!config.dry_run.enabled);
        assert_eq!(config.dry_run.balance, dec!(1000));
    }

    #[test]
    fn test_sections_parse() {
        let config = AppConfig::from_toml(
            r#"
            [brokerage]
            api_key_name = "organizations/o/apiKeys/k"
            private_key = { file = "/run/secrets/cb.pem" }
            timeout_secs = 5

            [store]
            path = "/var/lib/recurbuy/allocations.json"

            [schedule]
            cron = "0 15 14 * * Fri"
            run_on_startup = true

            [engine]
            quote_currency = "USD"

            [identity]
            tenant = "contoso"
            tenant_id = "t-id"
            policy = "B2C_1_signin"
            audience = "client-id"

            [api]
            port = 8080

            [dry_run]
            enabled = true
            balance = 250.5
            "#,
        )
        .unwrap();

        assert_eq!(config.brokerage.api_key_name, "organizations/o/apiKeys/k");
        assert!(matches!(
            config.brokerage.private_key,
            KeySource::File(ref p) if p == Path::new("/run/secrets/cb.pem")
        ));
        assert_eq!(config.brokerage.timeout_secs, 5);
        assert!(config.schedule.run_on_startup);
        assert_eq!(config.engine.quote_currency, "USD");
        assert_eq!(config.engine.call_timeout_ms, 30_000);
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.bind_address, "0.0.0.0");
        assert_eq!(config.dry_run.balance, dec!(250.5));
        config.validate().unwrap();
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_KEY_NAME, "organizations/o/apiKeys/from-env"),
            (ENV_AUTHORIZED_USERS, "a@example.com,b@example.com"),
            (ENV_ALLOWED_ORIGIN, "   "),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(
            config.brokerage.api_key_name,
            "organizations/o/apiKeys/from-env"
        );
        assert_eq!(config.identity.authorized_users, "a@example.com,b@example.com");
        // Blank values leave the configured value alone.
        assert_eq!(config.api.allowed_origin, "http://localhost:3000");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.identity.audience = "client-id".to_string();
        config.validate().unwrap();

        let mut bad_cron = config.clone();
        bad_cron.schedule.cron = "every day".to_string();
        assert!(matches!(bad_cron.validate(), Err(AppError::Schedule(_))));

        let mut no_audience = config.clone();
        no_audience.identity.audience.clear();
        assert!(matches!(no_audience.validate(), Err(AppError::Config(_))));
        no_audience.api.enabled = false;
        no_audience.validate().unwrap();

        let mut no_timeout = config.clone();
        no_timeout.engine.call_timeout_ms = 0;
        assert!(no_timeout.validate().is_err());

        let mut negative = config;
        negative.dry_run.balance = dec!(-1);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = AppConfig::from_file("/nonexistent/recurbuy.toml");
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
