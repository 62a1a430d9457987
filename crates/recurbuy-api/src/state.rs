//! Shared handler state.

use std::sync::Arc;

use recurbuy_auth::TokenValidator;
use recurbuy_executor::ExecutionEngine;
use recurbuy_store::DynStore;

use crate::config::ApiConfig;

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct ApiState {
    pub(crate) validator: Arc<TokenValidator>,
    pub(crate) store: DynStore,
    pub(crate) engine: Arc<ExecutionEngine>,
    pub(crate) config: ApiConfig,
}

impl ApiState {
    pub fn new(
        validator: Arc<TokenValidator>,
        store: DynStore,
        engine: Arc<ExecutionEngine>,
        config: ApiConfig,
    ) -> Self {
        Self {
            validator,
            store,
            engine,
            config,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}
