use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};

use portal_access::domain::types::SessionPolicy;
use portal_access::router::build_router;
use portal_access::state::AppState;

/// Server whose database is unreachable; only paths that fail before storage succeed.
fn server() -> TestServer {
    let state = AppState {
        db: DatabaseConnection::Disconnected,
        policy: SessionPolicy::default(),
    };
    TestServer::new(build_router(state)).unwrap()
}

#[tokio::test]
async fn should_reject_unknown_action() {
    let response = server()
        .get("/api")
        .add_query_param("action", "delete")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["kind"], "INVALID_ACTION");
    assert_eq!(body["message"], "Invalid API call.");
}

#[tokio::test]
async fn should_reject_missing_action() {
    let response = server().post("/api").form(&[("user_id", "a@b.com")]).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid API call.");
}

#[tokio::test]
async fn should_reject_unknown_action_on_bare_post() {
    let response = server().post("/api?action=bogus").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["kind"], "INVALID_ACTION");
    assert_eq!(body["message"], "Invalid API call.");
}

#[tokio::test]
async fn should_answer_json_bodied_post_with_structured_error() {
    let response = server()
        .post("/api?action=validate")
        .json(&json!({ "user_id": "a@b.com", "passcode": "aB3xY9", "device_id": "dev-1" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "VALIDATION");
    assert_eq!(body["message"], "Missing ID or Passcode.");
}

#[tokio::test]
async fn should_read_query_fields_on_bare_post() {
    let response = server()
        .post("/api?action=validate&user_id=a%40b.com&passcode=aB3xY9")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "device identifier required");
}

#[tokio::test]
async fn should_require_user_id_on_request() {
    let response = server()
        .post("/api")
        .add_query_param("action", "request")
        .form(&[("user_id", "   ")])
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "VALIDATION");
    assert_eq!(body["message"], "Mobile/Email is required.");
}

#[tokio::test]
async fn should_require_passcode_on_validate() {
    let response = server()
        .post("/api?action=validate")
        .form(&[("user_id", "a@b.com"), ("device_id", "dev-1")])
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Missing ID or Passcode.");
}

#[tokio::test]
async fn should_require_device_on_validate() {
    let response = server()
        .post("/api?action=validate")
        .form(&[("user_id", "a@b.com"), ("passcode", "aB3xY9")])
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "device identifier required");
}

#[tokio::test]
async fn should_require_user_id_on_approve_link() {
    let response = server()
        .get("/api")
        .add_query_param("action", "approve_and_send")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "VALIDATION");
}

#[tokio::test]
async fn should_hide_storage_failure_details() {
    let response = server()
        .post("/api?action=request")
        .form(&[("user_id", "a@b.com")])
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["kind"], "INTERNAL");
    assert_eq!(body["message"], "internal error");
}

#[tokio::test]
async fn should_report_liveness_and_readiness() {
    let server = server();

    server.get("/healthz").await.assert_status_ok();
    server
        .get("/readyz")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn should_echo_request_id() {
    let server = server();

    let generated = server.get("/healthz").await;
    let id = generated.header("x-request-id");
    assert!(!id.is_empty());

    let echoed = server
        .get("/healthz")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-123"),
        )
        .await;
    assert_eq!(echoed.header("x-request-id").to_str().unwrap(), "req-123");
}
