//! Insert helpers for ClickHouse.

use crate::client::ClickHouseClient;
use crate::schema::CLICKS_TABLE;
use click_core::{EnrichedClick, Error, Result};
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::debug;

/// Flattened click row.
#[derive(Debug, Clone, PartialEq, Eq, Row, Serialize, Deserialize)]
pub struct ClickRow {
    pub link_id: String,
    pub workspace_id: String,
    pub short_code: String,
    pub timestamp: i64, // DateTime64(3) as milliseconds
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
    pub country: String,
    pub region: String,
    pub city: String,
    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub os_version: String,
    pub device: String,
    pub is_bot: u8,
}

impl From<&EnrichedClick> for ClickRow {
    fn from(click: &EnrichedClick) -> Self {
        let event = &click.event;
        Self {
            link_id: event.link_id.clone(),
            workspace_id: event.workspace_id.clone(),
            short_code: event.short_code.clone(),
            timestamp: event.timestamp.timestamp_millis(),
            ip: event.ip.clone(),
            user_agent: event.user_agent.clone(),
            referer: event.referer.clone(),
            country: click.country.clone(),
            region: click.region.clone(),
            city: click.city.clone(),
            browser: click.browser.clone(),
            browser_version: click.browser_version.clone(),
            os: click.os.clone(),
            os_version: click.os_version.clone(),
            device: click.device.clone(),
            is_bot: u8::from(click.is_bot),
        }
    }
}

/// Insert a batch of clicks in one round trip.
pub async fn insert_clicks(client: &ClickHouseClient, rows: &[ClickRow]) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let count = rows.len();
    let start = std::time::Instant::now();

    let mut insert = client
        .inner()
        .insert(CLICKS_TABLE)
        .map_err(|e| Error::analytics(format!("Insert error: {}", e)))?;

    for row in rows {
        insert
            .write(row)
            .await
            .map_err(|e| Error::analytics(format!("Write error: {}", e)))?;
    }

    insert
        .end()
        .await
        .map_err(|e| Error::analytics(format!("End error: {}", e)))?;

    let elapsed = start.elapsed();
    metrics().analytics_latency_ms.observe(elapsed.as_millis() as u64);
    metrics().analytics_rows_written.inc_by(count as u64);

    debug!(
        count = count,
        latency_ms = %elapsed.as_millis(),
        "Inserted clicks to ClickHouse"
    );

    Ok(count)
}

/// Insert one click through the server-side async insert buffer.
///
/// Returns once the server has accepted the row into its buffer; the flush
/// to the table is not awaited.
pub async fn insert_click_async(client: &ClickHouseClient, row: &ClickRow) -> Result<()> {
    let mut insert = client
        .inner()
        .clone()
        .with_option("async_insert", "1")
        .with_option("wait_for_async_insert", "0")
        .insert(CLICKS_TABLE)
        .map_err(|e| Error::analytics(format!("Insert error: {}", e)))?;

    insert
        .write(row)
        .await
        .map_err(|e| Error::analytics(format!("Write error: {}", e)))?;

    insert
        .end()
        .await
        .map_err(|e| Error::analytics(format!("End error: {}", e)))?;

    metrics().analytics_rows_written.inc();
    Ok(())
}
