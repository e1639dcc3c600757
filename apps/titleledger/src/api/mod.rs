//! # Title Registry HTTP API
//!
//! An HTTP dispatcher in front of the core registry, using axum.
//!
//! ## Endpoints
//!
//! - `POST /invoke` - Run any operation: `{"function": "...", "args": [...]}`
//! - `POST /query` - Raw read: `{"args": [key]}`
//! - `GET /titles` - List indexed ids
//! - `GET /titles/{id}` - Decoded title record
//! - `GET /audit` - Index consistency report
//! - `GET /health` - Health check
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `TITLELEDGER_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `TITLELEDGER_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `TITLELEDGER_API_KEY`: If set, requires Bearer token authentication
//!
//! The API key check is optional transport hardening for the HTTP listener.
//! The registry itself does not authenticate or authorize callers.

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{API_KEY_ENV, get_api_key_from_env};
pub use handlers::status_for;
pub use middleware::{RATE_LIMIT_ENV, create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    AuditResponse, HealthResponse, InvokeRequest, InvokeResponse, QueryRequest,
    TitleListResponse, TitleResponse,
};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use titleledger_core::{LedgerError, LedgerStore, Registry};
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable holding allowed CORS origins.
pub const CORS_ORIGINS_ENV: &str = "TITLELEDGER_CORS_ORIGINS";

/// Request body cap. Arguments are bounded well below this by the core.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// A registry over whichever ledger backend was selected at startup.
pub type SharedRegistry = Registry<Arc<dyn LedgerStore>>;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// Reads share the lock; mutations hold it exclusively.
    pub registry: Arc<RwLock<SharedRegistry>>,
    /// Whether `write` is accepted over HTTP.
    pub allow_raw_write: bool,
}

impl AppState {
    #[must_use]
    pub fn new(registry: SharedRegistry, allow_raw_write: bool) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            allow_raw_write,
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from `TITLELEDGER_CORS_ORIGINS`.
///
/// `*` allows every origin. Unset, or a list with no valid origin, falls back
/// to localhost only.
fn build_cors_layer() -> CorsLayer {
    match std::env::var(CORS_ORIGINS_ENV).ok().as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins ({}=*). This is insecure for production!",
                CORS_ORIGINS_ENV
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", origin);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();

            if allowed.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                cors_for(localhost_origins())
            } else {
                cors_for(allowed)
            }
        }
        None => cors_for(localhost_origins()),
    }
}

fn localhost_origins() -> Vec<HeaderValue> {
    [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect()
}

fn cors_for(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit, rate
/// limiting (if enabled), authentication (if configured).
pub fn create_router(state: AppState) -> Router {
    let rate_limit = get_rate_limit_from_env();
    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set {} to enable authentication.",
            API_KEY_ENV
        );
    }
    if !state.allow_raw_write {
        tracing::info!("raw write disabled for HTTP callers");
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/invoke", post(handlers::invoke_handler))
        .route("/query", post(handlers::query_handler))
        .route("/titles", get(handlers::list_titles_handler))
        .route("/titles/{id}", get(handlers::get_title_handler))
        .route("/audit", get(handlers::audit_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind `addr` and serve until Ctrl+C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), LedgerError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| LedgerError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("titleledger HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| LedgerError::Io(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
