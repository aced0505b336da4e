//! End-to-end tests for the click pipeline.
//!
//! These tests validate the full data flow in one process:
//! enqueue → queue → ClickProcessor → primary store + pub/sub → dispatcher → hub → viewer
//!
//! The Redis round trip at the bottom needs Docker and is ignored by default.

use click_core::RealtimeMessage;
use integration_tests::{
    containers, fixtures,
    setup::{next_message, wait_for_depth, wait_until, PipelineContext},
};
use queue::{
    ClickEnqueuer, EventQueue, NotificationPublisher, NotificationSubscriber, QueueBackend,
    QueueConfig, RedisEventQueue, RedisPubSub,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Click enqueued by the redirect path reaches the primary store, the
/// secondary store, and a live viewer.
#[tokio::test]
async fn test_click_reaches_every_sink() {
    let ctx = PipelineContext::new().await;
    let workspace = fixtures::workspace_id();
    let link = fixtures::link_id();
    let (_viewer, mut rx) = ctx.viewer(&workspace, &[]).await;

    let event = fixtures::click_from(&workspace, &link, "203.0.113.7", fixtures::SAFARI_IPHONE)
        .with_referer("https://t.co/x");
    ctx.enqueuer.enqueue(&event);
    ctx.wait_for_depth(1).await;

    let outcome = ctx.run_cycle().await.expect("queue should not be empty");
    assert_eq!(outcome.received, 1);
    assert_eq!(outcome.persisted, 1);
    assert_eq!(outcome.counted, 1);

    let rows = ctx.primary.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event, event);
    assert_eq!(rows[0].device, "mobile");
    assert!(!rows[0].is_bot);
    assert_eq!(ctx.primary.counters(&link), (1, 1));

    let message = next_message(&mut rx).await;
    assert_eq!(message["type"], "click");
    assert_eq!(message["data"]["link_id"], link.as_str());
    assert_eq!(message["data"]["workspace_id"], workspace.as_str());
    assert_eq!(message["data"]["device"], "mobile");
    assert_eq!(message["data"]["referer"], "https://t.co/x");

    ctx.wait_for_secondary(1).await;
    assert_eq!(ctx.secondary.rows()[0].event, event);
}

/// Rows land in the primary store in the order the redirect path enqueued
/// them, even for a burst on one link with the runtime free to reorder tasks.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fifo_order_preserved() {
    let ctx = PipelineContext::new().await;
    let workspace = fixtures::workspace_id();
    let link = fixtures::link_id();
    let events: Vec<_> = (0..50)
        .map(|i| {
            fixtures::click_from(
                &workspace,
                &link,
                &format!("198.51.100.{}", i),
                fixtures::CHROME_DESKTOP,
            )
        })
        .collect();

    for event in &events {
        ctx.enqueuer.enqueue(event);
    }
    ctx.wait_for_depth(events.len() as u64).await;

    let outcome = ctx.run_cycle().await.unwrap();
    assert_eq!(outcome.persisted, 50);

    let stored: Vec<_> = ctx.primary.rows().into_iter().map(|r| r.event).collect();
    assert_eq!(stored, events);
}

/// Viewers narrowed to a link only see that link; workspace-wide viewers
/// see everything in their workspace; no viewer sees another workspace.
#[tokio::test]
async fn test_viewer_routing() {
    let ctx = PipelineContext::new().await;
    let workspace = fixtures::workspace_id();
    let other_workspace = fixtures::workspace_id();
    let watched = fixtures::link_id();
    let unwatched = fixtures::link_id();

    let (_wide, mut wide_rx) = ctx.viewer(&workspace, &[]).await;
    let (_narrow, mut narrow_rx) = ctx.viewer(&workspace, &[&watched]).await;
    let (_outsider, mut outsider_rx) = ctx.viewer(&other_workspace, &[]).await;

    ctx.push(&fixtures::click(&workspace, &watched)).await;
    ctx.push(&fixtures::click(&workspace, &unwatched)).await;
    ctx.run_cycle().await.unwrap();

    assert_eq!(next_message(&mut wide_rx).await["data"]["link_id"], watched.as_str());
    assert_eq!(next_message(&mut wide_rx).await["data"]["link_id"], unwatched.as_str());
    assert_eq!(next_message(&mut narrow_rx).await["data"]["link_id"], watched.as_str());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(narrow_rx.try_recv().is_err(), "narrowed viewer saw another link");
    assert!(wide_rx.try_recv().is_err(), "duplicate delivery");
    assert!(outsider_rx.try_recv().is_err(), "cross-workspace delivery");
}

/// Unsubscribing from the last link widens the viewer back to the workspace.
#[tokio::test]
async fn test_unsubscribe_restores_workspace_feed() {
    let ctx = PipelineContext::new().await;
    let workspace = fixtures::workspace_id();
    let watched = fixtures::link_id();
    let other = fixtures::link_id();

    let (id, mut rx) = ctx.viewer(&workspace, &[&watched]).await;
    assert!(ctx.hub.unsubscribe_link(id, &watched));

    ctx.push(&fixtures::click(&workspace, &other)).await;
    ctx.run_cycle().await.unwrap();

    assert_eq!(next_message(&mut rx).await["data"]["link_id"], other.as_str());
}

/// A click whose insert fails still notifies viewers.
#[tokio::test]
async fn test_failed_insert_still_notifies() {
    let ctx = PipelineContext::new().await;
    let workspace = fixtures::workspace_id();
    let link = fixtures::link_id();
    ctx.primary.fail_inserts_when(|_| true);
    let (_viewer, mut rx) = ctx.viewer(&workspace, &[]).await;

    ctx.push(&fixtures::click(&workspace, &link)).await;
    let outcome = ctx.run_cycle().await.unwrap();

    assert_eq!(outcome.failed, 1);
    assert_eq!(ctx.primary.row_count(), 0);
    assert_eq!(next_message(&mut rx).await["data"]["link_id"], link.as_str());
}

/// The processor run loop drains the queue and stops on shutdown.
#[tokio::test]
async fn test_run_loop_drains_and_stops() {
    let ctx = PipelineContext::new().await;
    let workspace = fixtures::workspace_id();
    for event in fixtures::clicks(&workspace, "loop", 10) {
        ctx.push(&event).await;
    }

    let processor = ctx.processor.clone();
    let handle = tokio::spawn({
        let shutdown = ctx.shutdown_rx();
        async move { processor.run(shutdown).await }
    });

    wait_until(Duration::from_secs(2), || ctx.primary.row_count() == 10).await;
    ctx.shutdown();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("processor did not stop")
        .unwrap();
}

/// Realtime message JSON decodes back into the notification type.
#[tokio::test]
async fn test_viewer_message_shape() {
    let ctx = PipelineContext::new().await;
    let workspace = fixtures::workspace_id();
    let link = fixtures::link_id();
    let (_viewer, mut rx) = ctx.viewer(&workspace, &[&link]).await;

    let event = fixtures::click(&workspace, &link);
    ctx.push(&event).await;
    ctx.run_cycle().await.unwrap();

    let message = next_message(&mut rx).await;
    let RealtimeMessage::Click(data) = serde_json::from_value(message).unwrap();
    assert_eq!(data.short_code, event.short_code);
    assert_eq!(data.timestamp, event.timestamp);
    assert_eq!(data.browser, "Chrome");
    assert_eq!(data.device, "desktop");
}

/// Queue and notification round trip through a real Redis.
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_round_trip() {
    let redis = containers::start_redis().await;
    let config = QueueConfig {
        backend: QueueBackend::Redis,
        redis_url: redis.url.clone(),
        queue_key: format!("clicks:test:{}", uuid::Uuid::new_v4()),
        notification_channel: format!("clicks:test:{}", uuid::Uuid::new_v4()),
        ..Default::default()
    };

    let queue: Arc<dyn EventQueue> = Arc::new(RedisEventQueue::connect(&config).await.unwrap());
    let pubsub = Arc::new(RedisPubSub::connect(&config).await.unwrap());

    let workspace = fixtures::workspace_id();
    let events = fixtures::clicks(&workspace, "redis", 3);
    let enqueuer = ClickEnqueuer::new(queue.clone());
    for event in &events {
        queue.push(fixtures::payload(event)).await.unwrap();
    }
    let late = fixtures::click(&workspace, "redis-late");
    enqueuer.enqueue(&late);
    wait_for_depth(queue.as_ref(), 4).await;

    for event in events.iter().chain(std::iter::once(&late)) {
        let payload = queue
            .pop_blocking(Duration::from_secs(1))
            .await
            .unwrap()
            .expect("expected a queued click");
        assert_eq!(click_core::ClickEvent::from_payload(&payload).unwrap(), *event);
    }

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut notifications = pubsub.subscribe(shutdown_rx);
    // give the subscription time to reach the server
    tokio::time::sleep(Duration::from_millis(300)).await;

    let click = click_core::EnrichedClick::bare(events[0].clone());
    let notification = click_core::ClickNotification::from(&click);
    pubsub.publish(&notification).await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(2), notifications.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, notification);
}
