//! Authorization policy: validated identity against the allow-list.

use std::collections::HashSet;

use serde_json::{Map, Value};

/// A validated caller identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Principal {
    /// `sub` claim (falls back to `oid`).
    pub subject: Option<String>,
    /// First entry of `emails`, else `email`.
    pub email: Option<String>,
    /// Every claim of the validated token.
    pub claims: Map<String, Value>,
}

impl Principal {
    pub fn from_claims(claims: Map<String, Value>) -> Self {
        let subject = claims
            .get("sub")
            .or_else(|| claims.get("oid"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let email = match claims.get("emails") {
            Some(Value::Array(values)) => values.first().and_then(Value::as_str),
            Some(Value::String(single)) => Some(single.as_str()),
            _ => None,
        }
        .or_else(|| claims.get("email").and_then(Value::as_str))
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string);

        Self {
            subject,
            email,
            claims,
        }
    }
}

/// Normalized set of authorized email addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: HashSet<String>,
}

impl AllowList {
    /// Parse a comma-separated list. Entries are trimmed and lowercased; blanks dropped.
    pub fn parse(csv: &str) -> Self {
        Self {
            entries: csv
                .split(',')
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, email: &str) -> bool {
        self.entries.contains(&email.trim().to_lowercase())
    }
}

/// Fail-closed authorization: an empty list or a missing email is never authorized.
pub fn authorize(allow_list: &AllowList, principal: &Principal) -> bool {
    if allow_list.is_empty() {
        return false;
    }
    principal
        .email
        .as_deref()
        .is_some_and(|email| allow_list.contains(email))
}
