//! Enqueue boundary used by the redirect path.

use click_core::ClickEvent;
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

use crate::event_queue::EventQueue;

/// Clicks buffered between the redirect path and the queue.
pub const DEFAULT_ENQUEUE_CAPACITY: usize = 10_000;

struct Pending {
    link_id: String,
    payload: String,
}

/// Hands click events to the queue without making the caller wait.
///
/// A single pusher task drains a bounded channel, so payloads reach the
/// queue in the order `enqueue` was called. Redirect latency must not depend
/// on queue health: a full buffer drops the click, and every failure is
/// logged and counted rather than returned.
#[derive(Clone)]
pub struct ClickEnqueuer {
    tx: mpsc::Sender<Pending>,
}

impl ClickEnqueuer {
    /// Must be called from within a tokio runtime.
    pub fn new(queue: Arc<dyn EventQueue>) -> Self {
        Self::with_capacity(queue, DEFAULT_ENQUEUE_CAPACITY)
    }

    pub fn with_capacity(queue: Arc<dyn EventQueue>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(push_loop(queue, rx));
        Self { tx }
    }

    pub fn enqueue(&self, event: &ClickEvent) {
        let payload = match event.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                metrics().enqueue_errors.inc();
                error!(error = %e, link_id = %event.link_id, "Failed to serialize click event");
                return;
            }
        };

        let pending = Pending {
            link_id: event.link_id.clone(),
            payload,
        };
        match self.tx.try_send(pending) {
            Ok(()) => {}
            Err(TrySendError::Full(pending)) => {
                metrics().enqueue_dropped.inc();
                warn!(link_id = %pending.link_id, "Enqueue buffer full, dropping click");
            }
            Err(TrySendError::Closed(pending)) => {
                metrics().enqueue_errors.inc();
                error!(link_id = %pending.link_id, "Enqueue pusher has stopped");
            }
        }
    }
}

/// Runs until every `ClickEnqueuer` clone is dropped.
async fn push_loop(queue: Arc<dyn EventQueue>, mut rx: mpsc::Receiver<Pending>) {
    while let Some(Pending { link_id, payload }) = rx.recv().await {
        match queue.push(payload).await {
            Ok(()) => {
                metrics().clicks_enqueued.inc();
                debug!(link_id = %link_id, "Click enqueued");
            }
            Err(e) => {
                metrics().enqueue_errors.inc();
                error!(error = %e, link_id = %link_id, "Failed to enqueue click event");
            }
        }
    }
    debug!("Enqueue pusher stopped");
}
