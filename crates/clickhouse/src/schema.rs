//! ClickHouse table schemas.
//!
//! - LowCardinality for enum-like fields
//! - DateTime64(3) for millisecond precision
//! - rows expire after a year

use crate::client::ClickHouseClient;
use click_core::{Error, Result};
use tracing::debug;

/// Click table name.
pub const CLICKS_TABLE: &str = "clicks";

/// SQL for creating the database.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {database}")
}

/// SQL for creating the clicks table.
///
/// Ordered for the dashboard's access pattern: one workspace, one link, a
/// time range.
pub fn create_clicks_table(database: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{CLICKS_TABLE} (
    link_id String,
    workspace_id String,
    short_code String,
    timestamp DateTime64(3),

    -- Request
    ip String,
    user_agent String,
    referer String,

    -- Location (from geo-enrichment)
    country LowCardinality(String),
    region String,
    city String,

    -- Client
    browser LowCardinality(String),
    browser_version String,
    os LowCardinality(String),
    os_version String,
    device LowCardinality(String),
    is_bot UInt8,

    created_at DateTime DEFAULT now()
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY (workspace_id, link_id, timestamp)
TTL toDateTime(timestamp) + INTERVAL 365 DAY
SETTINGS index_granularity = 8192
"#
    )
}

/// Initialize the database schema.
///
/// Creates the database and the clicks table if they don't exist.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    let database = client.database();

    client
        .server()
        .query(&create_database(database))
        .execute()
        .await
        .map_err(|e| Error::analytics(format!("Schema init error: {}", e)))?;

    client
        .server()
        .query(&create_clicks_table(database))
        .execute()
        .await
        .map_err(|e| Error::analytics(format!("Schema init error: {}", e)))?;

    debug!(database = %database, "ClickHouse schema initialized");
    Ok(())
}
