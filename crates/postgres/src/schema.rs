//! Primary store schema.
//!
//! Only the pieces the click pipeline writes are managed here. The `links`
//! table belongs to the link-management service; the statement below creates
//! a minimal version when it is missing so a fresh database is usable.

use click_core::{Error, Result};
use sqlx::PgPool;
use tracing::debug;

/// Minimal links table.
pub const CREATE_LINKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS links (
    id TEXT PRIMARY KEY,
    workspace_id TEXT NOT NULL,
    short_code TEXT NOT NULL
)
"#;

/// Link counters maintained by the click processor.
pub const ADD_TOTAL_CLICKS: &str =
    "ALTER TABLE links ADD COLUMN IF NOT EXISTS total_clicks BIGINT NOT NULL DEFAULT 0";

pub const ADD_UNIQUE_CLICKS: &str =
    "ALTER TABLE links ADD COLUMN IF NOT EXISTS unique_clicks BIGINT NOT NULL DEFAULT 0";

/// One row per click, enriched.
pub const CREATE_CLICKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS clicks (
    id BIGSERIAL PRIMARY KEY,
    link_id TEXT NOT NULL,
    workspace_id TEXT NOT NULL,
    short_code TEXT NOT NULL,
    clicked_at TIMESTAMPTZ NOT NULL,
    ip TEXT NOT NULL DEFAULT '',
    user_agent TEXT NOT NULL DEFAULT '',
    referer TEXT NOT NULL DEFAULT '',
    country TEXT NOT NULL DEFAULT '',
    region TEXT NOT NULL DEFAULT '',
    city TEXT NOT NULL DEFAULT '',
    browser TEXT NOT NULL DEFAULT '',
    browser_version TEXT NOT NULL DEFAULT '',
    os TEXT NOT NULL DEFAULT '',
    os_version TEXT NOT NULL DEFAULT '',
    device TEXT NOT NULL DEFAULT '',
    is_bot BOOLEAN NOT NULL DEFAULT FALSE
)
"#;

pub const CREATE_CLICKS_LINK_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS clicks_link_id_clicked_at_idx ON clicks (link_id, clicked_at)";

pub const CREATE_CLICKS_WORKSPACE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS clicks_workspace_id_clicked_at_idx ON clicks (workspace_id, clicked_at)";

/// All statements, in execution order.
pub fn all_statements() -> Vec<&'static str> {
    vec![
        CREATE_LINKS_TABLE,
        ADD_TOTAL_CLICKS,
        ADD_UNIQUE_CLICKS,
        CREATE_CLICKS_TABLE,
        CREATE_CLICKS_LINK_INDEX,
        CREATE_CLICKS_WORKSPACE_INDEX,
    ]
}

/// Create the clicks table and counter columns if they don't exist.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    for sql in all_statements() {
        sqlx::query(sql)
            .execute(pool)
            .await
            .map_err(|e| Error::storage(format!("Schema init error: {}", e)))?;
    }
    debug!("Postgres schema initialized");
    Ok(())
}
