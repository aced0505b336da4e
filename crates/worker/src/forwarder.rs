//! Best-effort replication into the secondary analytics store.

use click_core::{EnrichedClick, SecondaryStore};
use std::sync::Arc;
use telemetry::metrics;
use tracing::{debug, warn};

/// Forwards enriched clicks to the secondary store.
///
/// Never fails from the caller's point of view: errors are logged and
/// counted, nothing is retried.
#[derive(Clone)]
pub struct SecondaryForwarder {
    store: Arc<dyn SecondaryStore>,
}

impl SecondaryForwarder {
    pub fn new(store: Arc<dyn SecondaryStore>) -> Self {
        Self { store }
    }

    /// Forward one click without waiting for the store to acknowledge it.
    pub async fn forward(&self, click: &EnrichedClick) {
        if let Err(e) = self.store.insert_one(click).await {
            metrics().analytics_errors.inc();
            warn!(error = %e, link_id = %click.link_id(), "Secondary store write failed");
        }
    }

    /// Forward a batch in one write.
    pub async fn forward_batch(&self, clicks: &[EnrichedClick]) {
        if clicks.is_empty() {
            return;
        }

        match self.store.insert_batch(clicks).await {
            Ok(()) => debug!(count = clicks.len(), "Forwarded batch to secondary store"),
            Err(e) => {
                metrics().analytics_errors.inc();
                warn!(error = %e, count = clicks.len(), "Secondary store batch write failed");
            }
        }
    }
}
