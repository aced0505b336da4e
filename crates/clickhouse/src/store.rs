//! `SecondaryStore` backed by ClickHouse.

use async_trait::async_trait;
use click_core::{EnrichedClick, Result, SecondaryStore};

use crate::client::ClickHouseClient;
use crate::insert::{insert_click_async, insert_clicks, ClickRow};

#[derive(Clone)]
pub struct ClickHouseStore {
    client: ClickHouseClient,
}

impl ClickHouseStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }
}

#[async_trait]
impl SecondaryStore for ClickHouseStore {
    async fn insert_one(&self, click: &EnrichedClick) -> Result<()> {
        insert_click_async(&self.client, &ClickRow::from(click)).await
    }

    async fn insert_batch(&self, clicks: &[EnrichedClick]) -> Result<()> {
        let rows: Vec<ClickRow> = clicks.iter().map(ClickRow::from).collect();
        insert_clicks(&self.client, &rows).await.map(|_| ())
    }
}
