//! Periodic dependency probes run by the worker scheduler.

use async_trait::async_trait;
use std::sync::Arc;

use clickhouse_client::ClickHouseClient;
use postgres_store::PgPrimaryStore;
use queue::EventQueue;
use worker::HealthCheck;

pub struct QueueCheck(pub Arc<dyn EventQueue>);

#[async_trait]
impl HealthCheck for QueueCheck {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn check(&self) -> bool {
        queue::health::check_connection(self.0.as_ref()).await
    }
}

pub struct PostgresCheck(pub PgPrimaryStore);

#[async_trait]
impl HealthCheck for PostgresCheck {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn check(&self) -> bool {
        postgres_store::health::check_connection(self.0.pool()).await
    }
}

pub struct ClickHouseCheck(pub ClickHouseClient);

#[async_trait]
impl HealthCheck for ClickHouseCheck {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    async fn check(&self) -> bool {
        clickhouse_client::health::check_connection(&self.0).await
    }
}
