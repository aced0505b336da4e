//! ClickHouse health checks.

use crate::client::ClickHouseClient;
use telemetry::health;
use tracing::{debug, error};

/// Check ClickHouse connection health and record the result.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    // no database selected, so the probe works before the schema exists
    match client.server().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            health().clickhouse.set_healthy();
            debug!("ClickHouse connection healthy");
            true
        }
        Err(e) => {
            health().clickhouse.set_unhealthy(e.to_string());
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}
