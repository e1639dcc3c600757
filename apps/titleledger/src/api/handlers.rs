//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! Handlers forward to the core registry and translate [`LedgerError`] kinds
//! into HTTP status codes with [`status_for`].

use super::{
    AppState,
    types::{
        AuditResponse, HealthResponse, InvokeRequest, InvokeResponse, QueryRequest,
        TitleListResponse, TitleResponse,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use titleledger_core::{LedgerError, Operation};

/// HTTP status for a registry error.
pub fn status_for(e: &LedgerError) -> StatusCode {
    match e {
        LedgerError::Argument(_) | LedgerError::UnknownOperation(_) | LedgerError::Decode(_) => {
            StatusCode::BAD_REQUEST
        }
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::AlreadyExists(_) | LedgerError::Conflict { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// INVOKE HANDLER
// =============================================================================

/// Run any dispatch operation by name.
pub async fn invoke_handler(
    State(state): State<AppState>,
    Json(request): Json<InvokeRequest>,
) -> impl IntoResponse {
    let op = match request.function.parse::<Operation>() {
        Ok(op) => op,
        Err(e) => {
            tracing::warn!(function = %request.function, "run did not find func");
            return (status_for(&e), Json(InvokeResponse::error(&e)));
        }
    };

    if op == Operation::Write && !state.allow_raw_write {
        tracing::warn!(event = "raw_write_rejected", "raw write disabled by configuration");
        return (
            StatusCode::FORBIDDEN,
            Json(InvokeResponse::failure(
                "forbidden",
                "raw write is disabled on this server",
            )),
        );
    }

    run_operation(&state, op, &request.args).await
}

// =============================================================================
// QUERY HANDLER
// =============================================================================

/// Raw read of one key.
pub async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> impl IntoResponse {
    run_operation(&state, Operation::Query, &request.args).await
}

/// Mutations take the write lock, reads share the read lock.
async fn run_operation(
    state: &AppState,
    op: Operation,
    args: &[String],
) -> (StatusCode, Json<InvokeResponse>) {
    let result = if op.is_mutating() {
        let registry = state.registry.write().await;
        registry.invoke(op, args)
    } else {
        let registry = state.registry.read().await;
        registry.invoke(op, args)
    };

    match result {
        Ok(payload) => (StatusCode::OK, Json(InvokeResponse::success(payload))),
        Err(e) => {
            tracing::debug!(operation = %op, error = %e, "operation failed");
            (status_for(&e), Json(InvokeResponse::error(&e)))
        }
    }
}

// =============================================================================
// TITLE HANDLERS
// =============================================================================

/// List every indexed id.
pub async fn list_titles_handler(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry.read().await;
    match registry.title_ids() {
        Ok(ids) => (StatusCode::OK, Json(TitleListResponse::success(ids))),
        Err(e) => (status_for(&e), Json(TitleListResponse::error(&e))),
    }
}

/// Fetch and decode one title.
pub async fn get_title_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let registry = state.registry.read().await;
    match registry.read_title(&id) {
        Ok(title) => (StatusCode::OK, Json(TitleResponse::success(title))),
        Err(e) => (status_for(&e), Json(TitleResponse::error(&e))),
    }
}

// =============================================================================
// AUDIT HANDLER
// =============================================================================

/// Check the index against the records it points to.
pub async fn audit_handler(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry.read().await;
    match registry.audit() {
        Ok(report) => (StatusCode::OK, Json(AuditResponse::success(report))),
        Err(e) => (status_for(&e), Json(AuditResponse::error(&e))),
    }
}
