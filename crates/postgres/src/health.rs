//! Postgres health checks.

use sqlx::PgPool;
use telemetry::health;
use tracing::{debug, error};

/// Check the primary store connection and record the result.
pub async fn check_connection(pool: &PgPool) -> bool {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => {
            health().postgres.set_healthy();
            debug!("Postgres connection healthy");
            true
        }
        Err(e) => {
            health().postgres.set_unhealthy(e.to_string());
            error!("Postgres health check failed: {}", e);
            false
        }
    }
}
