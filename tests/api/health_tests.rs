//! Health Check API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_liveness_check() {
    let app = TestApp::new();

    let response = app.server.get("/health/live").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "alive");
}

#[tokio::test]
async fn test_readiness_check_on_memory_backend() {
    let app = TestApp::new();

    let response = app.server.get("/health/ready").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["repository"]["status"], "healthy");
    assert!(body["checks"].get("redis").is_none());
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("x-frame-options"), "DENY");
    assert!(response.maybe_header("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/does-not-exist").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "ROUTE_NOT_FOUND");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new();
    app.server.get("/health").await.assert_status_ok();

    let response = app.server.get("/metrics").await;

    response.assert_status_ok();
    assert!(response.text().contains("http_requests_total"));
}
