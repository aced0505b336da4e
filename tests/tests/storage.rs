//! Store implementations against real Postgres and ClickHouse.
//!
//! Requires Docker to be running for testcontainers; ignored by default.

use click_core::{EnrichedClick, PrimaryStore, SecondaryStore};
use clickhouse_client::{
    count_link_clicks, query_link_clicks, schema::init_schema, ClickHouseStore,
};
use integration_tests::{containers, fixtures};
use postgres_store::PgPrimaryStore;
use std::time::Duration;

fn enriched(workspace: &str, link: &str) -> EnrichedClick {
    let mut click = EnrichedClick::bare(fixtures::click(workspace, link));
    click.country = "NL".into();
    click.browser = "Chrome".into();
    click.device = "desktop".into();
    click
}

async fn insert_link(store: &PgPrimaryStore, workspace: &str, link: &str) {
    sqlx::query("INSERT INTO links (id, workspace_id, short_code) VALUES ($1, $2, $3)")
        .bind(link)
        .bind(workspace)
        .bind("abc123")
        .execute(store.pool())
        .await
        .expect("Failed to insert link");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_postgres_insert_and_counters() {
    let (_pg, store) = containers::start_postgres().await;
    let workspace = fixtures::workspace_id();
    let link = fixtures::link_id();
    insert_link(&store, &workspace, &link).await;

    store.insert_click(&enriched(&workspace, &link)).await.unwrap();
    store.insert_click(&enriched(&workspace, &link)).await.unwrap();
    store.increment_link_counters(&link, true).await.unwrap();
    store.increment_link_counters(&link, false).await.unwrap();

    assert_eq!(store.count_link_clicks(&link).await.unwrap(), 2);
    assert_eq!(store.link_counters(&link).await.unwrap(), Some((2, 1)));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_postgres_increment_unknown_link_is_noop() {
    let (_pg, store) = containers::start_postgres().await;
    let link = fixtures::link_id();

    store.increment_link_counters(&link, true).await.unwrap();
    assert_eq!(store.link_counters(&link).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_clickhouse_batch_and_single_insert() {
    let (_ch, client) = containers::start_clickhouse().await;
    init_schema(&client).await.expect("Failed to initialize schema");
    let store = ClickHouseStore::new(client.clone());

    let workspace = fixtures::workspace_id();
    let link = fixtures::link_id();
    let batch: Vec<EnrichedClick> = (0..5).map(|_| enriched(&workspace, &link)).collect();
    store.insert_batch(&batch).await.unwrap();
    assert_eq!(count_link_clicks(&client, &link).await.unwrap(), 5);

    let mut bot = enriched(&workspace, &link);
    bot.is_bot = true;
    store.insert_one(&bot).await.unwrap();

    // async inserts are flushed by the server on its own schedule
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while count_link_clicks(&client, &link).await.unwrap() < 6 {
        assert!(std::time::Instant::now() < deadline, "async insert never landed");
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    let rows = query_link_clicks(&client, &link, 10).await.unwrap();
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r.workspace_id == workspace));
    assert_eq!(rows.iter().filter(|r| r.is_bot == 1).count(), 1);
    assert!(rows.iter().all(|r| r.country == "NL" && r.device == "desktop"));
}
