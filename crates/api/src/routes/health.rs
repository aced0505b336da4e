//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::{health, metrics};
use tracing::debug;

use crate::response::HealthResponse;
use crate::state::AppState;

/// GET /health - Full health check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    if let Some(queue) = &state.queue {
        match queue.depth().await {
            Ok(depth) => metrics().queue_depth.set(depth),
            Err(e) => debug!(error = %e, "Queue depth unavailable"),
        }
    }

    let report = health().report();
    let clickhouse = &health().clickhouse;

    Json(HealthResponse {
        status: format!("{:?}", report.status).to_lowercase(),
        redis_connected: health().redis.is_healthy(),
        postgres_connected: health().postgres.is_healthy(),
        clickhouse_connected: clickhouse.is_enabled().then(|| clickhouse.is_healthy()),
        queue_depth: metrics().queue_depth.get(),
        active_connections: metrics().active_connections.get(),
    })
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
