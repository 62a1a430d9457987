//! Bearer token validation.

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::IdentityConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwks::DynKeySetProvider;
use crate::policy::{authorize, AllowList, Principal};

const BEARER: &str = "Bearer";

/// Algorithms accepted for provider-issued tokens.
const ACCEPTED_ALGORITHMS: [Algorithm; 5] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::ES256,
    Algorithm::ES384,
];

/// Result of validating one request's credentials.
///
/// Check `is_authenticated` before `is_authorized`; the two map to different
/// response codes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthOutcome {
    pub is_authenticated: bool,
    pub is_authorized: bool,
    /// Validated identity, for logging and audit only.
    pub principal: Option<Principal>,
}

impl AuthOutcome {
    fn unauthenticated() -> Self {
        Self::default()
    }
}

/// Validates provider-issued bearer tokens and applies the allow-list.
pub struct TokenValidator {
    issuer: String,
    audience: String,
    leeway_secs: u64,
    allow_list: AllowList,
    keys: DynKeySetProvider,
}

impl TokenValidator {
    pub fn new(config: &IdentityConfig, keys: DynKeySetProvider) -> Self {
        let allow_list = AllowList::parse(&config.authorized_users);
        if allow_list.is_empty() {
            warn!("Authorized user list is empty; every caller will be refused");
        }
        Self {
            issuer: config.expected_issuer(),
            audience: config.audience.clone(),
            leeway_secs: config.leeway_secs,
            allow_list,
            keys,
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Validate a raw `Authorization` header value and apply the allow-list.
    ///
    /// Never fails: every error is logged and reported as not authenticated.
    pub async fn validate_and_authorize(&self, authorization: Option<&str>) -> AuthOutcome {
        let principal = match self.authenticate(authorization).await {
            Ok(principal) => principal,
            Err(e) => {
                warn!(error = %e, "Token validation failed");
                return AuthOutcome::unauthenticated();
            }
        };

        let is_authorized = authorize(&self.allow_list, &principal);
        if !is_authorized {
            warn!(
                subject = ?principal.subject,
                email = ?principal.email,
                "Authenticated caller is not on the allow-list"
            );
        }

        AuthOutcome {
            is_authenticated: true,
            is_authorized,
            principal: Some(principal),
        }
    }

    /// Authenticate a raw `Authorization` header value.
    pub async fn authenticate(&self, authorization: Option<&str>) -> AuthResult<Principal> {
        let token = bearer_token(authorization)?;
        self.validate_token(token).await
    }

    /// Validate a bare token: signature, issuer, audience, validity window.
    pub async fn validate_token(&self, token: &str) -> AuthResult<Principal> {
        let header = decode_header(token)?;
        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        // Unknown key id: the set may have rotated, so try one forced refresh.
        let keys = self.keys.key_set(false).await?;
        let keys = if keys.find(&kid).is_some() {
            keys
        } else {
            debug!(kid = %kid, "Key id not in cached set, refreshing");
            self.keys.key_set(true).await?
        };
        let jwk = find_key(&keys, &kid)?;
        if let Some(key_alg) = &jwk.common.key_algorithm {
            // Both enums name algorithms by their JOSE identifier.
            if format!("{key_alg:?}") != format!("{:?}", header.alg) {
                return Err(AuthError::UnsupportedAlgorithm(format!(
                    "token uses {:?} but key {kid} is {key_alg:?}",
                    header.alg
                )));
            }
        }
        let key = DecodingKey::from_jwk(jwk)?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = self.leeway_secs;

        let data = decode::<Map<String, Value>>(token, &key, &validation)?;
        let principal = Principal::from_claims(data.claims);
        debug!(subject = ?principal.subject, "Token validated");
        Ok(principal)
    }
}

fn find_key<'a>(keys: &'a JwkSet, kid: &str) -> AuthResult<&'a Jwk> {
    keys.find(kid)
        .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
}

/// Strip the `Bearer` scheme (case-insensitive) from a header value.
fn bearer_token(authorization: Option<&str>) -> AuthResult<&str> {
    let value = authorization.ok_or(AuthError::MissingHeader)?.trim();
    let scheme = value
        .get(..BEARER.len())
        .filter(|scheme| scheme.eq_ignore_ascii_case(BEARER))
        .ok_or(AuthError::InvalidScheme)?;
    let rest = &value[scheme.len()..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return Err(AuthError::InvalidScheme);
    }
    let token = rest.trim_start();
    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok(token)
}
