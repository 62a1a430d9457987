//! Identity provider configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identity provider and allow-list configuration.
///
/// The metadata address and issuer are derived from the B2C tenant and policy
/// unless overridden explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Tenant name (the `<tenant>` in `<tenant>.b2clogin.com`).
    #[serde(default)]
    pub tenant: String,
    /// Tenant id (GUID) used in the issuer URL.
    #[serde(default)]
    pub tenant_id: String,
    /// Sign-in policy / user flow name.
    #[serde(default)]
    pub policy: String,
    /// Expected audience (application / client id).
    #[serde(default)]
    pub audience: String,
    /// Comma-separated allow-list of email addresses.
    #[serde(default)]
    pub authorized_users: String,
    /// Explicit OpenID configuration URL.
    #[serde(default)]
    pub metadata_url: Option<String>,
    /// Explicit expected issuer.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Clock skew tolerance for `exp` / `nbf`.
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,
    /// How long a fetched key set is trusted before re-fetching.
    #[serde(default = "default_key_cache_ttl_secs")]
    pub key_cache_ttl_secs: u64,
    /// Minimum spacing between forced refreshes triggered by unknown key ids.
    #[serde(default = "default_min_refresh_interval_secs")]
    pub min_refresh_interval_secs: u64,
    /// Timeout for discovery and key set requests.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_leeway_secs() -> u64 {
    300
}

fn default_key_cache_ttl_secs() -> u64 {
    3600
}

fn default_min_refresh_interval_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            tenant: String::new(),
            tenant_id: String::new(),
            policy: String::new(),
            audience: String::new(),
            authorized_users: String::new(),
            metadata_url: None,
            issuer: None,
            leeway_secs: default_leeway_secs(),
            key_cache_ttl_secs: default_key_cache_ttl_secs(),
            min_refresh_interval_secs: default_min_refresh_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl IdentityConfig {
    /// OpenID configuration document URL.
    pub fn metadata_address(&self) -> String {
        match self.metadata_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None => format!(
                "https://{tenant}.b2clogin.com/{tenant}.onmicrosoft.com/{policy}/v2.0/.well-known/openid-configuration",
                tenant = self.tenant,
                policy = self.policy
            ),
        }
    }

    /// Issuer every accepted token must carry.
    pub fn expected_issuer(&self) -> String {
        match self.issuer.as_deref().filter(|i| !i.is_empty()) {
            Some(issuer) => issuer.to_string(),
            None => format!(
                "https://{}.b2clogin.com/{}/v2.0/",
                self.tenant, self.tenant_id
            ),
        }
    }

    pub fn key_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.key_cache_ttl_secs)
    }

    pub fn min_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.min_refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
