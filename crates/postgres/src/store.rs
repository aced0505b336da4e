//! Primary store implementation on a sqlx Postgres pool.

use async_trait::async_trait;
use click_core::{EnrichedClick, Error, PrimaryStore, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Instant;
use telemetry::metrics;
use tracing::{info, warn};

use crate::config::PostgresConfig;

const INSERT_CLICK: &str = r#"
INSERT INTO clicks (
    link_id, workspace_id, short_code, clicked_at, ip, user_agent, referer,
    country, region, city, browser, browser_version, os, os_version, device, is_bot
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
"#;

const INCREMENT_COUNTERS: &str = r#"
UPDATE links
SET total_clicks = total_clicks + 1,
    unique_clicks = unique_clicks + $2
WHERE id = $1
"#;

/// Click rows and link counters in Postgres.
#[derive(Clone)]
pub struct PgPrimaryStore {
    pool: PgPool,
}

impl PgPrimaryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool, and create the schema when configured to.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| Error::storage(format!("Failed to connect to Postgres: {}", e)))?;

        if config.init_schema {
            crate::schema::init_schema(&pool).await?;
        }

        info!(max_connections = config.max_connections, "Connected to Postgres");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Read back a link's counters as `(total_clicks, unique_clicks)`.
    pub async fn link_counters(&self, link_id: &str) -> Result<Option<(i64, i64)>> {
        sqlx::query_as::<_, (i64, i64)>(
            "SELECT total_clicks, unique_clicks FROM links WHERE id = $1",
        )
        .bind(link_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage(format!("Query error: {}", e)))
    }

    /// Number of click rows stored for a link.
    pub async fn count_link_clicks(&self, link_id: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT count(*) FROM clicks WHERE link_id = $1")
            .bind(link_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::storage(format!("Query error: {}", e)))
    }
}

#[async_trait]
impl PrimaryStore for PgPrimaryStore {
    async fn insert_click(&self, click: &EnrichedClick) -> Result<()> {
        let start = Instant::now();
        let event = &click.event;

        sqlx::query(INSERT_CLICK)
            .bind(&event.link_id)
            .bind(&event.workspace_id)
            .bind(&event.short_code)
            .bind(event.timestamp)
            .bind(&event.ip)
            .bind(&event.user_agent)
            .bind(&event.referer)
            .bind(&click.country)
            .bind(&click.region)
            .bind(&click.city)
            .bind(&click.browser)
            .bind(&click.browser_version)
            .bind(&click.os)
            .bind(&click.os_version)
            .bind(&click.device)
            .bind(click.is_bot)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage(format!("Insert click error: {}", e)))?;

        metrics()
            .primary_latency_ms
            .observe(start.elapsed().as_millis() as u64);
        Ok(())
    }

    async fn increment_link_counters(&self, link_id: &str, unique: bool) -> Result<()> {
        let result = sqlx::query(INCREMENT_COUNTERS)
            .bind(link_id)
            .bind(i64::from(unique))
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage(format!("Increment counters error: {}", e)))?;

        if result.rows_affected() == 0 {
            warn!(link_id = %link_id, "Counter increment matched no link");
        }
        Ok(())
    }
}
