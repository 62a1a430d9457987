//! Application wiring and the scheduler loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use recurbuy_api::{run_server, ApiState};
use recurbuy_auth::{OidcKeySetProvider, TokenValidator};
use recurbuy_brokerage::{BrokerageClient, DynGateway, KeyManager, MockGateway, RequestSigner};
use recurbuy_core::RunReport;
use recurbuy_executor::ExecutionEngine;
use recurbuy_store::{DynStore, FileAllocationStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{AppConfig, BrokerageConfig};
use crate::error::AppResult;
use crate::schedule::RunSchedule;

/// Main application.
///
/// Every collaborator is built here and handed down explicitly.
pub struct Application {
    config: AppConfig,
    schedule: RunSchedule,
    store: DynStore,
    engine: Arc<ExecutionEngine>,
}

impl Application {
    /// Build the application from configuration.
    ///
    /// With `dry_run` the brokerage is simulated and no signing key is loaded.
    pub fn new(config: AppConfig, dry_run: bool) -> AppResult<Self> {
        let store: DynStore = Arc::new(FileAllocationStore::new(config.store.path.clone()));
        info!(path = %config.store.path.display(), "Using file allocation store");

        let gateway: DynGateway = if dry_run {
            warn!(
                balance = %config.dry_run.balance,
                "Dry run: orders are simulated and never sent to the brokerage"
            );
            Arc::new(MockGateway::new(config.dry_run.balance))
        } else {
            connect_brokerage(&config.brokerage)?
        };

        Self::from_parts(config, store, gateway)
    }

    /// Build the application around an existing store and gateway.
    pub fn from_parts(config: AppConfig, store: DynStore, gateway: DynGateway) -> AppResult<Self> {
        let schedule = RunSchedule::parse(&config.schedule.cron)?;
        let engine = Arc::new(ExecutionEngine::new(
            store.clone(),
            gateway,
            config.engine.clone(),
        ));

        Ok(Self {
            config,
            schedule,
            store,
            engine,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// Execute a single run and return its report.
    pub async fn run_once(&self) -> AppResult<RunReport> {
        Ok(self.engine.run().await?)
    }

    /// Serve the API (when enabled) and fire runs on schedule until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let api_handle = self.spawn_api(shutdown_rx)?;

        if self.config.schedule.run_on_startup {
            self.execute("startup").await;
        }

        info!(cron = %self.schedule.expression(), "Scheduler started");
        loop {
            let now = Utc::now();
            let Some(next) = self.schedule.next_after(now) else {
                warn!(cron = %self.schedule.expression(), "Schedule has no upcoming runs");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for shutdown signal");
                }
                break;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next_run = %next, wait_secs = wait.as_secs(), "Next run scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.execute("schedule").await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        let _ = shutdown_tx.send(true);
        if let Some(handle) = api_handle {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Management API exited with error"),
                Err(e) => error!(error = %e, "Management API task panicked"),
            }
        }

        info!("Application stopped");
        Ok(())
    }

    fn spawn_api(
        &self,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> AppResult<Option<JoinHandle<recurbuy_api::ApiResult<()>>>> {
        if !self.config.api.enabled {
            info!("Management API disabled");
            return Ok(None);
        }

        let keys = OidcKeySetProvider::new(&self.config.identity)?;
        info!(metadata_url = %keys.metadata_url(), "Identity provider configured");
        let validator = TokenValidator::new(&self.config.identity, Arc::new(keys));
        info!(
            authorized_users = validator.allow_list().len(),
            "Authorization allow-list loaded"
        );

        let state = ApiState::new(
            Arc::new(validator),
            self.store.clone(),
            self.engine.clone(),
            self.config.api.clone(),
        );
        // Reject a bad origin at startup rather than inside the task.
        recurbuy_api::create_router(state.clone())?;

        let shutdown = async move {
            let _ = shutdown_rx.changed().await;
        };
        Ok(Some(tokio::spawn(run_server(state, shutdown))))
    }

    /// Run the engine for a scheduled trigger. Failures are logged, never propagated.
    async fn execute(&self, trigger: &'static str) {
        info!(trigger, "Starting execution run");
        match self.engine.run().await {
            Ok(report) => info!(
                trigger,
                termination = ?report.termination,
                placed = report.placed(),
                skipped = report.skipped(),
                failed = report.failed(),
                "Scheduled run complete"
            ),
            Err(e) => error!(trigger, error = %e, "Scheduled run failed"),
        }
    }
}

/// Load the signing key once and build the live brokerage client.
fn connect_brokerage(config: &BrokerageConfig) -> AppResult<DynGateway> {
    let keys = KeyManager::load(config.api_key_name.clone(), &config.private_key)?;
    info!(key_name = %keys.key_name(), "Brokerage signing key loaded");

    let signer = RequestSigner::new(Arc::new(keys));
    let client = BrokerageClient::new(&config.api_base, signer, config.timeout())?;
    info!(api_base = %config.api_base, "Brokerage client ready");

    Ok(Arc::new(client))
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("schedule", &self.schedule.expression())
            .field("api_enabled", &self.config.api.enabled)
            .finish_non_exhaustive()
    }
}
