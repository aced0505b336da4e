//! Common test setup functions.

use api::{router, AppState};
use axum::Router;
use click_core::ClickEvent;
use queue::{
    ClickEnqueuer, EventQueue, MemoryEventQueue, MemoryPubSub, NotificationSubscriber,
};
use realtime::{Client, ClientId, ConnectionConfig, Hub, HubConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use worker::{BatchOutcome, ClickProcessor, ProcessorConfig, SecondaryForwarder};

use crate::mocks::{MockPrimaryStore, MockSecondaryStore};

/// Processor timings short enough to keep tests fast.
pub fn fast_processor_config() -> ProcessorConfig {
    ProcessorConfig {
        pop_timeout_ms: 200,
        max_batch_window_ms: 200,
        error_backoff_ms: 50,
        ..Default::default()
    }
}

/// The whole pipeline wired in-process.
///
/// This exercises the production code paths:
/// - the real `ClickProcessor` over the in-memory queue
/// - the real hub, dispatcher, and Axum router
/// - mock stores implementing the same `PrimaryStore` and `SecondaryStore`
///   traits as Postgres and ClickHouse
pub struct PipelineContext {
    pub queue: Arc<MemoryEventQueue>,
    pub bus: Arc<MemoryPubSub>,
    pub primary: MockPrimaryStore,
    pub secondary: MockSecondaryStore,
    pub processor: Arc<ClickProcessor>,
    pub enqueuer: ClickEnqueuer,
    pub hub: Hub,
    pub router: Router,
    shutdown_tx: watch::Sender<bool>,
}

impl PipelineContext {
    pub async fn new() -> Self {
        Self::with_config(fast_processor_config()).await
    }

    pub async fn with_config(config: ProcessorConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let queue = Arc::new(MemoryEventQueue::new());
        let bus = Arc::new(MemoryPubSub::new(256));
        let primary = MockPrimaryStore::new();
        let secondary = MockSecondaryStore::new();

        let processor = ClickProcessor::new(
            queue.clone(),
            Arc::new(primary.clone()),
            bus.clone(),
            config,
        )
        .with_forwarder(SecondaryForwarder::new(Arc::new(secondary.clone())));

        let (hub, hub_loop) = Hub::new(HubConfig::default());
        tokio::spawn(hub_loop.run(shutdown_rx.clone()));

        let notifications = bus.subscribe(shutdown_rx);
        tokio::spawn(realtime::run_dispatcher(hub.clone(), notifications));

        let state = AppState::new(hub.clone(), ConnectionConfig::default())
            .with_queue(queue.clone() as Arc<dyn EventQueue>);

        Self {
            enqueuer: ClickEnqueuer::new(queue.clone()),
            queue,
            bus,
            primary,
            secondary,
            processor: Arc::new(processor),
            hub,
            router: router(state),
            shutdown_tx,
        }
    }

    /// Push a click straight onto the queue.
    pub async fn push(&self, event: &ClickEvent) {
        self.queue.push(event.to_payload().unwrap()).await.unwrap();
    }

    pub async fn push_raw(&self, payload: impl Into<String>) {
        self.queue.push(payload.into()).await.unwrap();
    }

    /// Run one processor cycle.
    pub async fn run_cycle(&self) -> Option<BatchOutcome> {
        self.processor.run_cycle().await.unwrap()
    }

    /// Register a viewer for the workspace, optionally narrowed to links.
    pub async fn viewer(
        &self,
        workspace_id: &str,
        links: &[&str],
    ) -> (ClientId, mpsc::Receiver<Arc<str>>) {
        let (client, rx) = Client::new(workspace_id, 64);
        let id = client.id();
        self.hub.register(client).await.unwrap();
        for link in links {
            assert!(self.hub.subscribe_link(id, link));
        }
        (id, rx)
    }

    /// Wait until the queue holds at least `depth` payloads.
    pub async fn wait_for_depth(&self, depth: u64) {
        wait_for_depth(self.queue.as_ref(), depth).await;
    }

    /// Wait for the secondary forwarder task to catch up.
    pub async fn wait_for_secondary(&self, rows: usize) {
        wait_until(Duration::from_secs(2), || self.secondary.row_count() >= rows).await;
    }

    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for PipelineContext {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Poll `condition` until it holds, panicking after `timeout`.
pub async fn wait_until<F>(timeout: Duration, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {:?}",
            timeout
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll a queue's depth until it reaches `depth`, panicking after two seconds.
pub async fn wait_for_depth(queue: &dyn EventQueue, depth: u64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while queue.depth().await.unwrap() < depth {
        assert!(
            tokio::time::Instant::now() < deadline,
            "queue never reached depth {}",
            depth
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Receive the next viewer message as JSON, failing after one second.
pub async fn next_message(rx: &mut mpsc::Receiver<Arc<str>>) -> serde_json::Value {
    let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for a viewer message")
        .expect("viewer channel closed");
    serde_json::from_str(&message).unwrap()
}
