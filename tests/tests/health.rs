//! Tests for health, stats, and WebSocket endpoints.
//!
//! The health registry is process-global, so these tests assert on shape
//! and on values no other test in this binary changes.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::PipelineContext};

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = PipelineContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();

    for field in [
        "status",
        "redis_connected",
        "postgres_connected",
        "queue_depth",
        "active_connections",
    ] {
        assert!(body.get(field).is_some(), "Response should have '{}' field", field);
    }

    let status = body["status"].as_str().unwrap_or("");
    assert!(
        matches!(status, "healthy" | "degraded" | "unhealthy"),
        "unexpected status '{}'",
        status
    );
}

/// /health refreshes queue depth from the queue
#[tokio::test]
async fn test_health_reports_queue_depth() {
    let ctx = PipelineContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let workspace = fixtures::workspace_id();
    for event in fixtures::clicks(&workspace, "depth", 3) {
        ctx.push(&event).await;
    }

    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["queue_depth"].as_u64(), Some(3));
}

/// Test /health/ready endpoint
#[tokio::test]
async fn test_ready_endpoint() {
    let ctx = PipelineContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let status = server.get("/health/ready").await.status_code();
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "Ready endpoint should return 200 or 503, got {}",
        status
    );
}

/// Test /health/live endpoint always returns 200 when service is running
#[tokio::test]
async fn test_live_endpoint() {
    let ctx = PipelineContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/health/live").await.assert_status_ok();
}

/// /realtime/stats reflects hub registrations
#[tokio::test]
async fn test_realtime_stats() {
    let ctx = PipelineContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let workspace = fixtures::workspace_id();
    let link = fixtures::link_id();
    let (_a, _rx_a) = ctx.viewer(&workspace, &[]).await;
    let (_b, _rx_b) = ctx.viewer(&workspace, &[&link]).await;

    let response = server.get("/realtime/stats").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["clients"], 2);
    assert_eq!(body["workspaces"], 1);
    assert_eq!(body["links"], 1);
    assert!(body["messages_sent"].is_u64());
    assert!(body["messages_dropped"].is_u64());
}

/// Invalid workspace ids are rejected before the upgrade
#[tokio::test]
async fn test_ws_rejects_invalid_workspace() {
    let ctx = PipelineContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/ws/bad%20id").await;
    assert_ne!(response.status_code(), StatusCode::SWITCHING_PROTOCOLS);
    assert!(response.status_code().is_client_error());
}
