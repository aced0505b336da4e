//! Store capabilities used by the click processor.

use async_trait::async_trait;

use crate::error::Result;
use crate::events::EnrichedClick;

/// Durable source of truth for clicks and link counters.
///
/// The row insert and the counter increment are independent operations; a
/// failure between them is not compensated.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    /// Insert one click row.
    async fn insert_click(&self, click: &EnrichedClick) -> Result<()>;

    /// Increment `total_clicks` for the link, and `unique_clicks` when `unique`.
    async fn increment_link_counters(&self, link_id: &str, unique: bool) -> Result<()>;
}

/// Columnar store for time-ranged aggregation. No transactional guarantees.
#[async_trait]
pub trait SecondaryStore: Send + Sync {
    /// Insert one row without waiting for the store to acknowledge it.
    async fn insert_one(&self, click: &EnrichedClick) -> Result<()>;

    /// Insert a batch of rows in a single round trip.
    async fn insert_batch(&self, clicks: &[EnrichedClick]) -> Result<()>;
}
