//! Signing key sets published by the identity provider.
//!
//! Keys are never hard-coded: the provider's OpenID configuration names a
//! `jwks_uri`, and the set behind it may rotate at any time.

use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::JwkSet;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::IdentityConfig;
use crate::error::{AuthError, AuthResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Source of the provider's signing keys.
pub trait KeySetProvider: Send + Sync {
    /// Current key set. `force_refresh` asks for a re-fetch (e.g. after an unknown
    /// key id); implementations may rate-limit it.
    fn key_set(&self, force_refresh: bool) -> BoxFuture<'_, AuthResult<Arc<JwkSet>>>;
}

/// Arc wrapper for key set provider trait objects.
pub type DynKeySetProvider = Arc<dyn KeySetProvider>;

/// Fixed key set for tests and offline deployments.
#[derive(Debug, Clone)]
pub struct StaticKeySetProvider {
    keys: Arc<JwkSet>,
}

impl StaticKeySetProvider {
    pub fn new(keys: JwkSet) -> Self {
        Self {
            keys: Arc::new(keys),
        }
    }
}

impl KeySetProvider for StaticKeySetProvider {
    fn key_set(&self, _force_refresh: bool) -> BoxFuture<'_, AuthResult<Arc<JwkSet>>> {
        let keys = self.keys.clone();
        Box::pin(async move { Ok(keys) })
    }
}

#[derive(Debug, Deserialize)]
struct OpenIdConfiguration {
    jwks_uri: String,
}

struct CachedKeys {
    keys: Arc<JwkSet>,
    fetched_at: Instant,
}

/// Discovery-backed provider with a TTL cache.
///
/// A forced refresh inside `min_refresh_interval` of the last fetch returns the
/// cached set, so a stream of tokens with unknown key ids cannot hammer the provider.
/// When a fetch fails and an older set is cached, the older set is served.
pub struct OidcKeySetProvider {
    client: Client,
    metadata_url: String,
    ttl: Duration,
    min_refresh_interval: Duration,
    cache: RwLock<Option<CachedKeys>>,
    refresh_lock: Mutex<()>,
}

impl OidcKeySetProvider {
    pub fn new(config: &IdentityConfig) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AuthError::KeyFetch(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            metadata_url: config.metadata_address(),
            ttl: config.key_cache_ttl(),
            min_refresh_interval: config.min_refresh_interval(),
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn metadata_url(&self) -> &str {
        &self.metadata_url
    }

    /// Cached set if it satisfies this request without a fetch.
    async fn cached(&self, force_refresh: bool) -> Option<Arc<JwkSet>> {
        let cache = self.cache.read().await;
        let cached = cache.as_ref()?;
        let age = cached.fetched_at.elapsed();
        let usable = if force_refresh {
            age < self.min_refresh_interval
        } else {
            age < self.ttl
        };
        usable.then(|| cached.keys.clone())
    }

    async fn fetch(&self) -> AuthResult<JwkSet> {
        debug!(url = %self.metadata_url, "Fetching OpenID configuration");
        let response = self
            .client
            .get(&self.metadata_url)
            .send()
            .await
            .map_err(|e| AuthError::Discovery(format!("HTTP request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Discovery(format!("HTTP {status}")));
        }
        let discovery: OpenIdConfiguration = response
            .json()
            .await
            .map_err(|e| AuthError::Discovery(format!("Failed to parse configuration: {e}")))?;

        debug!(url = %discovery.jwks_uri, "Fetching signing keys");
        let response = self
            .client
            .get(&discovery.jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(format!("HTTP request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::KeyFetch(format!("HTTP {status}")));
        }
        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeyFetch(format!("Failed to parse key set: {e}")))
    }

    async fn refresh(&self, force_refresh: bool) -> AuthResult<Arc<JwkSet>> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(keys) = self.cached(force_refresh).await {
            return Ok(keys);
        }

        match self.fetch().await {
            Ok(keys) => {
                info!(keys = keys.keys.len(), "Signing key set refreshed");
                let keys = Arc::new(keys);
                *self.cache.write().await = Some(CachedKeys {
                    keys: keys.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(keys)
            }
            Err(e) => {
                let stale = self.cache.read().await.as_ref().map(|c| c.keys.clone());
                match stale {
                    Some(keys) => {
                        warn!(error = %e, "Key set refresh failed, serving cached keys");
                        Ok(keys)
                    }
                    None => Err(e),
                }
            }
        }
    }
}

impl KeySetProvider for OidcKeySetProvider {
    fn key_set(&self, force_refresh: bool) -> BoxFuture<'_, AuthResult<Arc<JwkSet>>> {
        Box::pin(async move {
            if let Some(keys) = self.cached(force_refresh).await {
                return Ok(keys);
            }
            self.refresh(force_refresh).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JWKS: &str = r#"{"keys": [{
        "kty": "EC",
        "crv": "P-256",
        "kid": "k1",
        "use": "sig",
        "x": "9npWhSg-8ZWbbGMvvqqaa_xtRq29Dn7Nxd_YJ304wmU",
        "y": "HjuEo2dpjLMQrK1I-HvxIfiyoBXeOBm9JAY4zBt4ifw"
    }]}"#;

    #[tokio::test]
    async fn test_static_provider_returns_same_set() {
        let set: JwkSet = serde_json::from_str(SAMPLE_JWKS).unwrap();
        let provider = StaticKeySetProvider::new(set);
        let keys = provider.key_set(true).await.unwrap();
        assert!(keys.find("k1").is_some());
        assert!(keys.find("other").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_error() {
        let config = IdentityConfig {
            metadata_url: Some("http://127.0.0.1:1/.well-known/openid-configuration".to_string()),
            request_timeout_secs: 1,
            ..IdentityConfig::default()
        };
        let provider = OidcKeySetProvider::new(&config).unwrap();
        assert!(matches!(
            provider.key_set(false).await,
            Err(AuthError::Discovery(_))
        ));
    }
}
