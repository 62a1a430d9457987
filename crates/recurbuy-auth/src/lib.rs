//! Bearer token validation and allow-list authorization.
//!
//! Authentication and authorization are separate answers:
//!
//! - authenticated: signature verifies against the provider's published keys, issuer
//!   and audience match, and the token is inside its validity window
//! - authorized: the token's email claim is on the configured allow-list
//!
//! Every failure folds to "not authenticated"; nothing propagates to the caller.

pub mod config;
pub mod error;
pub mod jwks;
pub mod policy;
pub mod validator;

pub use config::IdentityConfig;
pub use error::{AuthError, AuthResult};
pub use jwks::{BoxFuture, DynKeySetProvider, KeySetProvider, OidcKeySetProvider, StaticKeySetProvider};
pub use policy::{authorize, AllowList, Principal};
pub use validator::{AuthOutcome, TokenValidator};
