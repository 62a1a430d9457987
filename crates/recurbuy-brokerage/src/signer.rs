//! Per-request token signing for the brokerage REST API.
//!
//! Every call is authorized by its own short-lived ES256 token:
//!
//! ```text
//! header  {"alg":"ES256","typ":"JWT","kid":<key name>,"nonce":<64 hex chars>}
//! claims  {"iss":<key name>,"sub":<key name>,"nbf":now,"exp":now+120,"uri":"<METHOD> <host><path>"}
//! ```
//!
//! The `uri` claim binds the token to exactly one method and path, so tokens are
//! minted per call and never cached.

use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::DecodePrivateKey;
use p256::SecretKey;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

/// Token lifetime in seconds.
pub const TOKEN_LIFETIME_SECS: i64 = 120;

/// Nonce length in bytes (hex-encoded to 64 characters).
const NONCE_BYTES: usize = 32;

// =============================================================================
// KeySource and KeyManager
// =============================================================================

/// Source of the brokerage private key (PEM).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// Load from environment variable (development).
    Env(String),
    /// Load from file (production, recommend 0600 permissions).
    File(PathBuf),
}

impl Default for KeySource {
    fn default() -> Self {
        Self::Env("RECURBUY_API_PRIVATE_KEY".to_string())
    }
}

/// Holds the API key name and its parsed P-256 signing key.
///
/// Security notes:
/// - Keys are loaded once at startup; no runtime key rotation.
/// - PEM text is zeroized after parsing.
/// - Never log private key material.
pub struct KeyManager {
    key_name: String,
    signing_key: SigningKey,
}

impl KeyManager {
    /// Load the private key from `source` and bind it to `key_name`.
    ///
    /// # Errors
    /// Returns `KeyError` if the key name is empty, the source cannot be read,
    /// or the PEM does not hold a P-256 private key.
    pub fn load(key_name: impl Into<String>, source: &KeySource) -> Result<Self, KeyError> {
        let pem = match source {
            KeySource::Env(var_name) => Zeroizing::new(
                std::env::var(var_name).map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
            ),
            KeySource::File(path) => Zeroizing::new(std::fs::read_to_string(path)?),
        };
        Self::from_pem(key_name, &pem)
    }

    /// Parse a SEC1 (`EC PRIVATE KEY`) or PKCS#8 (`PRIVATE KEY`) PEM.
    ///
    /// Literal `\n` escapes (common when the key is pasted into an env var) are
    /// turned back into newlines first.
    pub fn from_pem(key_name: impl Into<String>, pem: &str) -> Result<Self, KeyError> {
        let key_name = key_name.into();
        if key_name.trim().is_empty() {
            return Err(KeyError::MissingKeyName);
        }

        let normalized = Zeroizing::new(pem.trim().replace("\\n", "\n"));
        if normalized.is_empty() {
            return Err(KeyError::EmptyKey);
        }

        let secret = if normalized.contains("BEGIN EC PRIVATE KEY") {
            SecretKey::from_sec1_pem(&normalized)
                .map_err(|e| KeyError::InvalidKey(e.to_string()))?
        } else if normalized.contains("BEGIN PRIVATE KEY") {
            SecretKey::from_pkcs8_pem(&normalized)
                .map_err(|e| KeyError::InvalidKey(e.to_string()))?
        } else {
            return Err(KeyError::UnsupportedFormat);
        };

        Ok(Self {
            key_name,
            signing_key: SigningKey::from(secret),
        })
    }

    /// API key identifier (used as `kid`, `iss` and `sub`).
    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// Public half of the signing key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("key_name", &self.key_name)
            .finish_non_exhaustive()
    }
}

/// Key loading errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("API key name is empty")]
    MissingKeyName,

    #[error("Private key is empty")]
    EmptyKey,

    #[error("Unsupported key format: expected an EC PRIVATE KEY or PRIVATE KEY PEM block")]
    UnsupportedFormat,

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Token minting
// =============================================================================

#[derive(Debug, Serialize)]
struct TokenHeader<'a> {
    alg: &'static str,
    typ: &'static str,
    kid: &'a str,
    nonce: String,
}

#[derive(Debug, Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    nbf: i64,
    exp: i64,
    uri: String,
}

/// Signer errors.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Token serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request target is empty")]
    EmptyTarget,
}

/// Mints one bound token per brokerage call.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    keys: Arc<KeyManager>,
}

impl RequestSigner {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }

    /// Mint a token for `"<METHOD> <host><path>"`, valid from now for two minutes.
    pub fn mint(&self, method: &str, host_path: &str) -> Result<String, SignerError> {
        self.mint_at(method, host_path, chrono::Utc::now().timestamp())
    }

    /// Mint a token with an explicit `nbf` (Unix seconds).
    pub fn mint_at(&self, method: &str, host_path: &str, now: i64) -> Result<String, SignerError> {
        if host_path.trim().is_empty() {
            return Err(SignerError::EmptyTarget);
        }

        let key_name = self.keys.key_name();
        let header = TokenHeader {
            alg: "ES256",
            typ: "JWT",
            kid: key_name,
            nonce: generate_nonce(),
        };
        let claims = TokenClaims {
            iss: key_name,
            sub: key_name,
            nbf: now,
            exp: now + TOKEN_LIFETIME_SECS,
            uri: format!("{} {}", method.to_uppercase(), host_path),
        };

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );

        // ES256: SHA-256 digest, fixed-size r || s
        let signature: Signature = self.keys.signing_key.sign(signing_input.as_bytes());

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    pub fn key_name(&self) -> &str {
        self.keys.key_name()
    }
}

/// 32 bytes from the OS CSPRNG, lowercase hex.
fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
