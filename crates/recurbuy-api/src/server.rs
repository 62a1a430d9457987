//! HTTP server implementation using axum.

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, AUTHORIZATION, CONTENT_TYPE,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use recurbuy_auth::AuthOutcome;
use recurbuy_core::{AllocationSettings, AllocationSettingsView, RunReport};
use recurbuy_executor::EngineError;
use recurbuy_telemetry::Metrics;
use serde_json::{json, Value};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization";
const PREFLIGHT_MAX_AGE_SECS: &str = "86400";

/// Create the axum router.
///
/// Fails when the configured allowed origin is not a valid header value.
pub fn create_router(state: ApiState) -> ApiResult<Router> {
    let origin = HeaderValue::from_str(&state.config.allowed_origin).map_err(|e| {
        ApiError::InvalidConfig(format!(
            "allowed_origin {:?}: {e}",
            state.config.allowed_origin
        ))
    })?;

    let router = Router::new()
        .route(
            "/api/allocations",
            get(get_allocations)
                .post(update_allocations)
                .options(preflight),
        )
        .route("/api/executions", post(execute_now).options(preflight))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            origin,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        ));

    Ok(router)
}

/// Validate the caller and apply the allow-list.
async fn authorize_request(state: &ApiState, headers: &HeaderMap) -> ApiResult<AuthOutcome> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        Metrics::auth_decision("missing_header");
        warn!("Request without authorization header");
        return Err(ApiError::MissingAuthorization);
    };

    // A non-ASCII header value cannot carry a valid bearer token.
    let outcome = state
        .validator
        .validate_and_authorize(Some(value.to_str().unwrap_or_default()))
        .await;

    if !outcome.is_authenticated {
        Metrics::auth_decision("unauthenticated");
        return Err(ApiError::InvalidToken);
    }
    if !outcome.is_authorized {
        Metrics::auth_decision("forbidden");
        return Err(ApiError::Forbidden);
    }

    Metrics::auth_decision("authorized");
    Ok(outcome)
}

fn caller_email(outcome: &AuthOutcome) -> Option<&str> {
    outcome.principal.as_ref().and_then(|p| p.email.as_deref())
}

/// Current settings plus the live quote balance (`null` when unreadable).
async fn get_allocations(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<AllocationSettingsView>> {
    let outcome = authorize_request(&state, &headers).await?;

    let settings = state.store.load().await.map_err(|e| {
        error!(error = %e, "Failed to load allocation settings");
        ApiError::Internal {
            action: "retrieving allocations",
            message: e.to_string(),
        }
    })?;

    let current_usdc_balance = match state.engine.quote_balance().await {
        Ok(balance) => Some(balance),
        Err(e) => {
            warn!(error = %e, "Quote balance unavailable for settings view");
            None
        }
    };

    info!(
        caller = ?caller_email(&outcome),
        allocations = settings.allocations.len(),
        "Allocation settings retrieved"
    );

    Ok(Json(AllocationSettingsView {
        settings,
        current_usdc_balance,
    }))
}

/// Replace the whole settings document.
async fn update_allocations(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let outcome = authorize_request(&state, &headers).await?;

    let settings = parse_submission(&body)?;

    state.store.save(&settings).await.map_err(|e| {
        error!(error = %e, "Failed to save allocation settings");
        ApiError::Internal {
            action: "updating allocations",
            message: e.to_string(),
        }
    })?;

    info!(
        caller = ?caller_email(&outcome),
        allocations = settings.allocations.len(),
        minimum = %settings.minimum_usdc_balance,
        "Allocation settings replaced"
    );

    Ok(Json(json!({ "success": true })))
}

/// Parse a submitted document: object or legacy array, non-empty, valid entries.
fn parse_submission(body: &[u8]) -> ApiResult<AllocationSettings> {
    let text = std::str::from_utf8(body).map_err(|_| ApiError::InvalidAllocationData)?;
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(ApiError::InvalidAllocationData);
    }

    let settings = AllocationSettings::from_document(trimmed).map_err(|e| {
        warn!(error = %e, "Rejected malformed allocation document");
        ApiError::InvalidAllocationData
    })?;
    settings.validate().map_err(|e| {
        warn!(error = %e, "Rejected invalid allocation document");
        ApiError::InvalidAllocationData
    })?;

    Ok(settings)
}

/// Run the engine now and return its report.
async fn execute_now(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<RunReport>> {
    let outcome = authorize_request(&state, &headers).await?;
    info!(caller = ?caller_email(&outcome), "Manual execution requested");

    // The run completes even if the client disconnects.
    let engine = state.engine.clone();
    let run = tokio::spawn(async move {
        let result = engine.run().await;
        match &result {
            Ok(report) => info!(
                termination = ?report.termination,
                placed = report.placed(),
                skipped = report.skipped(),
                failed = report.failed(),
                "Manual run complete"
            ),
            Err(e) => warn!(error = %e, "Manual run failed"),
        }
        result
    });

    let result = run.await.map_err(|e| {
        error!(error = %e, "Manual run task panicked");
        ApiError::Internal {
            action: "executing allocations",
            message: e.to_string(),
        }
    })?;

    match result {
        Ok(report) => Ok(Json(report)),
        Err(EngineError::RunInProgress) => Err(ApiError::RunInProgress),
        Err(e @ EngineError::BalanceUnavailable(_)) => Err(ApiError::Upstream {
            action: "executing allocations",
            message: e.to_string(),
        }),
        Err(e) => Err(ApiError::Internal {
            action: "executing allocations",
            message: e.to_string(),
        }),
    }
}

/// Cross-origin pre-flight. The shared CORS headers are added by the router layers.
async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE_SECS)],
    )
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics() -> Response {
    match Metrics::encode() {
        Ok(text) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => ApiError::Internal {
            action: "encoding metrics",
            message: e.to_string(),
        }
        .into_response(),
    }
}

/// Convert a handler panic into a plain-text 500.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %message, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Error processing request: {message}"),
    )
        .into_response()
}

/// Run the API server until `shutdown` resolves.
pub async fn run_server<F>(state: ApiState, shutdown: F) -> ApiResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind = format!("{}:{}", state.config.bind_address, state.config.port);
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| ApiError::InvalidConfig(format!("bind address {bind}: {e}")))?;

    let app = create_router(state)?;

    info!(%addr, "Starting management API server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Management API server stopped");
    Ok(())
}
