//! Integration tests for the titleledger HTTP API.
//!
//! Uses axum-test to exercise the router without binding a real socket.

// Allow unwrap and panic in tests - these are standard for test code
// Allow holding MutexGuard across await in auth tests - tests are serialized
// intentionally to avoid env var conflicts
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use serde_json::json;
use std::sync::{Arc, Mutex};
use titleledger::api::{
    API_KEY_ENV, AppState, AuditResponse, HealthResponse, InvokeResponse, SharedRegistry,
    TitleListResponse, TitleResponse, create_router,
};
use titleledger_core::{LedgerStore, MemoryLedger, Registry, decode_record};

/// Mutex to serialize tests since some modify env vars.
static AUTH_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Guard wrapper that holds the mutex and ensures cleanup on drop.
struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
        unsafe { std::env::remove_var(API_KEY_ENV) };
    }
}

fn memory_registry() -> SharedRegistry {
    let store: Arc<dyn LedgerStore> = Arc::new(MemoryLedger::new());
    Registry::new(store)
}

/// Build a server with the given API key (if any) and raw-write setting.
fn build_server(api_key: Option<&str>, allow_raw_write: bool) -> (TestServer, TestGuard) {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe {
        match api_key {
            Some(key) => std::env::set_var(API_KEY_ENV, key),
            None => std::env::remove_var(API_KEY_ENV),
        }
    }
    let state = AppState::new(memory_registry(), allow_raw_write);
    let router = create_router(state);
    (
        TestServer::new(router).unwrap(),
        TestGuard { _guard: guard },
    )
}

fn create_test_server() -> (TestServer, TestGuard) {
    build_server(None, true)
}

async fn invoke(server: &TestServer, function: &str, args: &[&str]) -> axum_test::TestResponse {
    server
        .post("/invoke")
        .json(&json!({ "function": function, "args": args }))
        .await
}

/// A server that has been initialized and holds title V1.
async fn create_populated_test_server() -> (TestServer, TestGuard) {
    let (server, guard) = create_test_server();
    invoke(&server, "initialize", &["100"]).await.assert_status_ok();
    invoke(
        &server,
        "init_title",
        &["V1", "1HGCM82633A004352", "Honda", "Civic", "ABC123", "Alice"],
    )
    .await
    .assert_status_ok();
    (server, guard)
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// INVOKE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_invoke_lifecycle() {
    let (server, _guard) = create_populated_test_server().await;

    invoke(&server, "set_owner", &["V1", "Bob"]).await.assert_status_ok();
    invoke(&server, "update_title", &["V1", "VIN2", "Toyota", "Corolla", "XYZ999"])
        .await
        .assert_status_ok();

    let response = invoke(&server, "query", &["V1"]).await;
    response.assert_status_ok();
    let body: InvokeResponse = response.json();
    assert!(body.success);
    let record = decode_record(&body.payload_bytes().unwrap()).unwrap();
    assert_eq!(record.owner, "Bob");
    assert_eq!(record.make, "Toyota");

    let response = invoke(&server, "delete", &["V1"]).await;
    response.assert_status_ok();
    let body: InvokeResponse = response.json();
    assert!(body.success);
    assert_eq!(body.payload, None);

    let list: TitleListResponse = server.get("/titles").await.json();
    assert_eq!(list.count, 0);
}

#[tokio::test]
async fn test_invoke_legacy_alias() {
    let (server, _guard) = create_test_server();
    invoke(&server, "init", &["1"]).await.assert_status_ok();
    invoke(&server, "init_v5c", &["V2", "v", "m", "m", "r", "Carol"])
        .await
        .assert_status_ok();

    let list: TitleListResponse = server.get("/titles").await.json();
    assert_eq!(list.ids, vec!["V2".to_string()]);
}

#[tokio::test]
async fn test_invoke_unknown_function_is_bad_request() {
    let (server, _guard) = create_test_server();

    let response = invoke(&server, "transfer", &["V1"]).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: InvokeResponse = response.json();
    assert!(!body.success);
    assert_eq!(body.error_kind.as_deref(), Some("unknown_operation"));
}

#[tokio::test]
async fn test_invoke_wrong_arity_is_bad_request() {
    let (server, _guard) = create_test_server();

    let response = invoke(&server, "init_title", &["V1", "v", "m"]).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: InvokeResponse = response.json();
    assert_eq!(body.error_kind.as_deref(), Some("argument"));
}

#[tokio::test]
async fn test_invoke_update_missing_title_is_not_found() {
    let (server, _guard) = create_populated_test_server().await;

    let response = invoke(&server, "update_title", &["V9", "a", "b", "c", "d"]).await;

    response.assert_status_not_found();
    let body: InvokeResponse = response.json();
    assert_eq!(body.error_kind.as_deref(), Some("not_found"));
}

#[tokio::test]
async fn test_invoke_transfer_malformed_record_is_bad_request() {
    let (server, _guard) = create_populated_test_server().await;
    invoke(&server, "write", &["V1", "not json"]).await.assert_status_ok();

    let response = invoke(&server, "set_owner", &["V1", "Bob"]).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: InvokeResponse = response.json();
    assert_eq!(body.error_kind.as_deref(), Some("decode"));
}

#[tokio::test]
async fn test_raw_write_forbidden_when_disabled() {
    let (server, _guard) = build_server(None, false);

    let response = invoke(&server, "write", &["k", "v"]).await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: InvokeResponse = response.json();
    assert_eq!(body.error_kind.as_deref(), Some("forbidden"));

    // Nothing was written.
    let response = server.post("/query").json(&json!({ "args": ["k"] })).await;
    response.assert_status_not_found();
}

// =============================================================================
// QUERY ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_query_returns_stored_bytes() {
    let (server, _guard) = create_test_server();
    invoke(&server, "write", &["note", "hello"]).await.assert_status_ok();

    let response = server.post("/query").json(&json!({ "args": ["note"] })).await;

    response.assert_status_ok();
    let body: InvokeResponse = response.json();
    assert_eq!(body.payload_bytes(), Some(b"hello".to_vec()));
}

#[tokio::test]
async fn test_query_missing_key_is_not_found() {
    let (server, _guard) = create_test_server();

    let response = server.post("/query").json(&json!({ "args": ["nope"] })).await;

    response.assert_status_not_found();
    let body: InvokeResponse = response.json();
    assert_eq!(body.error.as_deref(), Some("Failed to get state for nope"));
}

// =============================================================================
// TITLE AND AUDIT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_get_title_is_decoded() {
    let (server, _guard) = create_populated_test_server().await;

    let response = server.get("/titles/V1").await;

    response.assert_status_ok();
    let body: TitleResponse = response.json();
    let title = body.title.unwrap();
    assert_eq!(title.vin, "1hgcm82633a004352");
    assert_eq!(title.owner, "alice");
}

#[tokio::test]
async fn test_get_missing_title_is_not_found() {
    let (server, _guard) = create_test_server();
    server.get("/titles/V404").await.assert_status_not_found();
}

#[tokio::test]
async fn test_create_twice_duplicates_index_and_audit_reports_it() {
    let (server, _guard) = create_populated_test_server().await;
    invoke(&server, "init_title", &["V1", "v", "m", "m", "r", "Dan"])
        .await
        .assert_status_ok();

    let list: TitleListResponse = server.get("/titles").await.json();
    assert_eq!(list.ids, vec!["V1".to_string(), "V1".to_string()]);

    let response = server.get("/audit").await;
    response.assert_status_ok();
    let audit: AuditResponse = response.json();
    assert!(!audit.consistent);
    assert_eq!(audit.report.unwrap().duplicates.get("V1"), Some(&2));
}

// =============================================================================
// ERROR HANDLING TESTS
// =============================================================================

#[tokio::test]
async fn test_404_on_unknown_endpoint() {
    let (server, _guard) = create_test_server();
    server.get("/unknown").await.assert_status_not_found();
}

#[tokio::test]
async fn test_method_not_allowed() {
    let (server, _guard) = create_test_server();
    let response = server.get("/invoke").await;
    assert_eq!(response.status_code().as_u16(), 405);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/invoke")
        .text("not valid json")
        .content_type("application/json")
        .await;

    assert!(response.status_code().is_client_error());
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let api_key = "test-secret-key-12345";
    let (server, _guard) = build_server(Some(api_key), true);

    let response = server
        .get("/titles")
        .add_header(
            header::AUTHORIZATION,
            format!("Bearer {}", api_key).parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_valid_raw_token() {
    let api_key = "test-raw-key-67890";
    let (server, _guard) = build_server(Some(api_key), true);

    let response = server
        .get("/titles")
        .add_header(header::AUTHORIZATION, api_key.parse::<HeaderValue>().unwrap())
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_or_missing_token_rejected() {
    let (server, _guard) = build_server(Some("correct-key"), true);

    let response = server
        .get("/titles")
        .add_header(
            header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;
    assert_eq!(response.status_code().as_u16(), 401);

    let response = invoke(&server, "initialize", &["1"]).await;
    assert_eq!(response.status_code().as_u16(), 401);
}

#[tokio::test]
async fn test_auth_health_is_always_open() {
    let (server, _guard) = build_server(Some("secret"), true);
    server.get("/health").await.assert_status_ok();
}
