//! Brokerage access for the recurring buy service.
//!
//! # Key Components
//!
//! - [`RequestSigner`]: mints one ES256 token per REST call, bound to its method and path
//! - [`KeyManager`]: loads the P-256 private key once at startup
//! - [`BrokerageGateway`]: balance reads and market buys (dyn-compatible)
//! - [`BrokerageClient`]: reqwest implementation against the brokerage REST API
//! - [`MockGateway`]: scriptable in-memory gateway for tests and dry runs

pub mod client;
pub mod error;
pub mod gateway;
pub mod signer;
pub mod wire;

pub use client::{BrokerageClient, DEFAULT_API_BASE, DEFAULT_TIMEOUT};
pub use error::{GatewayError, GatewayResult};
pub use gateway::{BoxFuture, BrokerageGateway, DynGateway, MockGateway, OrderAck};
pub use signer::{KeyError, KeyManager, KeySource, RequestSigner, SignerError, TOKEN_LIFETIME_SECS};
pub use wire::OrderRejection;
