//! Unique-visitor tracking for link counters.

use click_core::EnrichedClick;
use moka::future::Cache;
use std::time::Duration;

/// Remembers which visitors clicked which link within a fixed window.
///
/// The window opens at a visitor's first click on a link; repeat clicks
/// inside it do not extend it. A visitor is the `(ip, user_agent)` pair.
/// Process-local: several processors each keep their own window.
#[derive(Clone)]
pub struct UniqueVisitors {
    seen: Cache<(String, String), ()>,
}

impl UniqueVisitors {
    pub fn new(window: Duration, capacity: u64) -> Self {
        Self {
            seen: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(window)
                .build(),
        }
    }

    /// Record the click and report whether it is the visitor's first for
    /// this link inside the window. Clicks with no visitor identity are
    /// always unique.
    pub async fn observe(&self, click: &EnrichedClick) -> bool {
        let event = &click.event;
        if event.ip.is_empty() && event.user_agent.is_empty() {
            return true;
        }

        let key = (
            event.link_id.clone(),
            format!("{}|{}", event.ip, event.user_agent),
        );
        self.seen.entry(key).or_insert(()).await.is_fresh()
    }
}
