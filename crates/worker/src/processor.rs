//! Click processor: the consumer side of the event queue.
//!
//! Each cycle:
//! 1. Block on the queue for the first event (bounded by the pop timeout)
//! 2. Drain ready events until the batch is full or the window closes
//! 3. Enrich, then persist to the primary store in pop order
//! 4. Hand the batch to the secondary forwarder and publish notifications
//!
//! Delivery is at-most-once: a popped event that is not persisted is gone.

use click_core::{ClickEvent, ClickNotification, EnrichedClick, PrimaryStore, Result};
use queue::{EventQueue, NotificationPublisher};
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ProcessorConfig;
use crate::enrichment::Enricher;
use crate::forwarder::SecondaryForwarder;
use crate::uniques::UniqueVisitors;

/// Tally of one processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Payloads taken off the queue
    pub received: usize,
    /// Payloads that failed to deserialize
    pub malformed: usize,
    /// Rows written to the primary store
    pub persisted: usize,
    /// Rows the primary store rejected
    pub failed: usize,
    /// Counter increments applied
    pub counted: usize,
    /// Events classified as bots
    pub bots: usize,
}

pub struct ClickProcessor {
    queue: Arc<dyn EventQueue>,
    store: Arc<dyn PrimaryStore>,
    publisher: Arc<dyn NotificationPublisher>,
    forwarder: Option<SecondaryForwarder>,
    enricher: Enricher,
    uniques: UniqueVisitors,
    config: ProcessorConfig,
}

impl ClickProcessor {
    pub fn new(
        queue: Arc<dyn EventQueue>,
        store: Arc<dyn PrimaryStore>,
        publisher: Arc<dyn NotificationPublisher>,
        config: ProcessorConfig,
    ) -> Self {
        let uniques = UniqueVisitors::new(config.unique_window(), config.unique_capacity);
        Self {
            queue,
            store,
            publisher,
            forwarder: None,
            enricher: Enricher::default(),
            uniques,
            config,
        }
    }

    /// Attach the secondary analytics forwarder.
    pub fn with_forwarder(mut self, forwarder: SecondaryForwarder) -> Self {
        self.forwarder = Some(forwarder);
        self
    }

    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Main run loop.
    ///
    /// Shutdown is checked between cycles only, so a batch in flight always
    /// completes. An idle processor notices shutdown within one pop timeout.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            max_batch_size = self.config.max_batch_size,
            max_batch_window_ms = self.config.max_batch_window_ms,
            pop_timeout_ms = self.config.pop_timeout_ms,
            secondary = self.forwarder.is_some(),
            "Click processor starting"
        );

        while !*shutdown.borrow() {
            match self.run_cycle().await {
                Ok(Some(outcome)) => {
                    debug!(
                        received = outcome.received,
                        persisted = outcome.persisted,
                        failed = outcome.failed,
                        malformed = outcome.malformed,
                        bots = outcome.bots,
                        "Processed batch"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    metrics().queue_errors.inc();
                    error!("Queue read error: {}", e);

                    tokio::select! {
                        _ = tokio::time::sleep(self.config.error_backoff()) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        info!("Click processor stopped");
    }

    /// Run one cycle. `Ok(None)` means the pop timed out with nothing to do.
    pub async fn run_cycle(&self) -> Result<Option<BatchOutcome>> {
        let Some(first) = self.queue.pop_blocking(self.config.pop_timeout()).await? else {
            return Ok(None);
        };

        let payloads = self.collect_batch(first).await;
        Ok(Some(self.process_batch(payloads).await))
    }

    /// Drain ready payloads behind `first` until the batch is full, the
    /// window closes, or the queue is empty.
    async fn collect_batch(&self, first: String) -> Vec<String> {
        let deadline = Instant::now() + self.config.max_batch_window();
        let mut batch = vec![first];

        while batch.len() < self.config.max_batch_size && Instant::now() < deadline {
            match self.queue.try_pop().await {
                Ok(Some(payload)) => batch.push(payload),
                Ok(None) => break,
                Err(e) => {
                    // keep what was already popped
                    metrics().queue_errors.inc();
                    warn!(error = %e, collected = batch.len(), "Queue read failed mid-batch");
                    break;
                }
            }
        }

        batch
    }

    /// Deserialize, enrich, persist, and fan out one batch of payloads.
    pub async fn process_batch(&self, payloads: Vec<String>) -> BatchOutcome {
        let start = std::time::Instant::now();
        let mut outcome = BatchOutcome {
            received: payloads.len(),
            ..Default::default()
        };
        metrics().events_popped.inc_by(payloads.len() as u64);

        let mut clicks: Vec<EnrichedClick> = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            match ClickEvent::from_payload(payload) {
                Ok(event) => clicks.push(self.enricher.enrich(event)),
                Err(e) => {
                    outcome.malformed += 1;
                    metrics().events_malformed.inc();
                    warn!(error = %e, len = payload.len(), "Dropping malformed click event");
                }
            }
        }

        for click in &clicks {
            self.persist(click, &mut outcome).await;
        }

        let notifications: Vec<ClickNotification> =
            clicks.iter().map(ClickNotification::from).collect();

        if let Some(forwarder) = self.forwarder.clone() {
            tokio::spawn(async move {
                forwarder.forward_batch(&clicks).await;
            });
        }

        for notification in &notifications {
            match self.publisher.publish(notification).await {
                Ok(()) => metrics().notifications_published.inc(),
                Err(e) => {
                    metrics().publish_errors.inc();
                    warn!(error = %e, link_id = %notification.link_id, "Failed to publish notification");
                }
            }
        }

        metrics().batches_processed.inc();
        metrics()
            .batch_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        outcome
    }

    /// Insert the row, then bump the counters for human clicks. The two
    /// writes are independent; a failed increment leaves the row in place.
    async fn persist(&self, click: &EnrichedClick, outcome: &mut BatchOutcome) {
        if click.is_bot {
            outcome.bots += 1;
            metrics().bot_clicks.inc();
        }

        if let Err(e) = self.store.insert_click(click).await {
            outcome.failed += 1;
            metrics().click_insert_errors.inc();
            error!(error = %e, link_id = %click.link_id(), "Failed to insert click");
            return;
        }
        outcome.persisted += 1;
        metrics().clicks_persisted.inc();

        if click.is_bot {
            return;
        }

        let unique = self.uniques.observe(click).await;
        match self.store.increment_link_counters(click.link_id(), unique).await {
            Ok(()) => {
                outcome.counted += 1;
                metrics().counter_increments.inc();
            }
            Err(e) => {
                metrics().counter_errors.inc();
                error!(error = %e, link_id = %click.link_id(), "Failed to increment link counters");
            }
        }
    }
}
