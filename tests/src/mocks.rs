//! Mock store implementations for testing.

use async_trait::async_trait;
use click_core::{EnrichedClick, Error, PrimaryStore, Result, SecondaryStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type FailPredicate = Arc<dyn Fn(&EnrichedClick) -> bool + Send + Sync>;

/// Primary store that keeps rows and counters in memory.
///
/// Implements the same `PrimaryStore` trait as the Postgres store, so tests
/// drive the processor through its production code path.
#[derive(Clone, Default)]
pub struct MockPrimaryStore {
    rows: Arc<Mutex<Vec<EnrichedClick>>>,
    /// link_id -> (total_clicks, unique_clicks)
    counters: Arc<Mutex<HashMap<String, (i64, i64)>>>,
    fail_insert: Arc<Mutex<Option<FailPredicate>>>,
    fail_increments: Arc<Mutex<bool>>,
}

impl MockPrimaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All inserted rows, in insertion order.
    pub fn rows(&self) -> Vec<EnrichedClick> {
        self.rows.lock().clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().len()
    }

    /// Link ids of inserted rows, in insertion order.
    pub fn inserted_links(&self) -> Vec<String> {
        self.rows
            .lock()
            .iter()
            .map(|r| r.event.link_id.clone())
            .collect()
    }

    /// `(total_clicks, unique_clicks)` for a link, zero when never incremented.
    pub fn counters(&self, link_id: &str) -> (i64, i64) {
        self.counters.lock().get(link_id).copied().unwrap_or((0, 0))
    }

    /// Reject inserts for which `predicate` returns true.
    pub fn fail_inserts_when<F>(&self, predicate: F)
    where
        F: Fn(&EnrichedClick) -> bool + Send + Sync + 'static,
    {
        *self.fail_insert.lock() = Some(Arc::new(predicate));
    }

    pub fn set_increments_failing(&self, fail: bool) {
        *self.fail_increments.lock() = fail;
    }
}

#[async_trait]
impl PrimaryStore for MockPrimaryStore {
    async fn insert_click(&self, click: &EnrichedClick) -> Result<()> {
        let predicate = self.fail_insert.lock().clone();
        if predicate.is_some_and(|fail| fail(click)) {
            return Err(Error::storage("Mock insert failure"));
        }

        self.rows.lock().push(click.clone());
        Ok(())
    }

    async fn increment_link_counters(&self, link_id: &str, unique: bool) -> Result<()> {
        if *self.fail_increments.lock() {
            return Err(Error::storage("Mock increment failure"));
        }

        let mut counters = self.counters.lock();
        let entry = counters.entry(link_id.to_string()).or_default();
        entry.0 += 1;
        if unique {
            entry.1 += 1;
        }
        Ok(())
    }
}

/// Secondary store that records forwarded clicks.
#[derive(Clone, Default)]
pub struct MockSecondaryStore {
    rows: Arc<Mutex<Vec<EnrichedClick>>>,
    batches: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockSecondaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<EnrichedClick> {
        self.rows.lock().clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn batch_count(&self) -> usize {
        *self.batches.lock()
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

#[async_trait]
impl SecondaryStore for MockSecondaryStore {
    async fn insert_one(&self, click: &EnrichedClick) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::analytics("Mock secondary failure"));
        }
        self.rows.lock().push(click.clone());
        Ok(())
    }

    async fn insert_batch(&self, clicks: &[EnrichedClick]) -> Result<()> {
        if *self.should_fail.lock() {
            return Err(Error::analytics("Mock secondary failure"));
        }
        self.rows.lock().extend_from_slice(clicks);
        *self.batches.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use click_core::ClickEvent;

    fn click(link: &str) -> EnrichedClick {
        EnrichedClick::bare(ClickEvent::new(link, "ws-test", "abc"))
    }

    #[tokio::test]
    async fn test_primary_records_rows_and_counters() {
        let store = MockPrimaryStore::new();
        store.insert_click(&click("link-1")).await.unwrap();
        store.increment_link_counters("link-1", true).await.unwrap();
        store.increment_link_counters("link-1", false).await.unwrap();

        assert_eq!(store.inserted_links(), vec!["link-1"]);
        assert_eq!(store.counters("link-1"), (2, 1));
        assert_eq!(store.counters("link-2"), (0, 0));
    }

    #[tokio::test]
    async fn test_primary_fail_predicate() {
        let store = MockPrimaryStore::new();
        store.fail_inserts_when(|c| c.event.link_id == "bad");

        assert!(store.insert_click(&click("bad")).await.is_err());
        assert!(store.insert_click(&click("good")).await.is_ok());
        assert_eq!(store.row_count(), 1);
    }

    #[tokio::test]
    async fn test_secondary_failure_mode() {
        let store = MockSecondaryStore::new();
        store.insert_batch(&[click("a"), click("b")]).await.unwrap();
        store.set_should_fail(true);
        assert!(store.insert_one(&click("c")).await.is_err());

        assert_eq!(store.row_count(), 2);
        assert_eq!(store.batch_count(), 1);
    }
}
