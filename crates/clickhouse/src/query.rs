//! Query functions for reading data back (used in tests and admin).

use crate::client::ClickHouseClient;
use crate::insert::ClickRow;
use click_core::{Error, Result};

const CLICK_COLUMNS: &str = "link_id, workspace_id, short_code, toUnixTimestamp64Milli(timestamp) AS timestamp, \
     ip, user_agent, referer, country, region, city, browser, browser_version, os, os_version, device, is_bot";

/// Count clicks for a workspace.
pub async fn count_clicks(client: &ClickHouseClient, workspace_id: &str) -> Result<u64> {
    let count: u64 = client
        .inner()
        .query("SELECT count() FROM clicks WHERE workspace_id = ?")
        .bind(workspace_id)
        .fetch_one()
        .await
        .map_err(|e| Error::analytics(format!("Query error: {}", e)))?;
    Ok(count)
}

/// Count clicks for a link.
pub async fn count_link_clicks(client: &ClickHouseClient, link_id: &str) -> Result<u64> {
    let count: u64 = client
        .inner()
        .query("SELECT count() FROM clicks WHERE link_id = ?")
        .bind(link_id)
        .fetch_one()
        .await
        .map_err(|e| Error::analytics(format!("Query error: {}", e)))?;
    Ok(count)
}

/// Fetch the most recent clicks for a link, newest first.
pub async fn query_link_clicks(
    client: &ClickHouseClient,
    link_id: &str,
    limit: u32,
) -> Result<Vec<ClickRow>> {
    let sql = format!(
        "SELECT {CLICK_COLUMNS} FROM clicks WHERE link_id = ? ORDER BY timestamp DESC LIMIT ?"
    );
    let rows: Vec<ClickRow> = client
        .inner()
        .query(&sql)
        .bind(link_id)
        .bind(limit)
        .fetch_all()
        .await
        .map_err(|e| Error::analytics(format!("Query error: {}", e)))?;
    Ok(rows)
}

/// Truncate the clicks table (test cleanup).
pub async fn truncate_clicks(client: &ClickHouseClient) -> Result<()> {
    client
        .inner()
        .query("TRUNCATE TABLE IF EXISTS clicks")
        .execute()
        .await
        .map_err(|e| Error::analytics(format!("Truncate error: {}", e)))?;
    Ok(())
}
