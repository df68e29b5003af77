//! Storage for finished conversions, keyed by conversion id.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::Result;

/// Everything produced for one upload. Written once, never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub pseudocode: String,
    pub explanation: String,
    /// SVG document, or failure text starting with `Error:`
    pub flowchart: String,
}

/// Backing store for conversion results.
///
/// Implementations must treat each id as write-once: `insert` is only ever
/// called with a freshly generated id.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn insert(&self, id: Uuid, result: ConversionResult) -> Result<()>;
    async fn get(&self, id: &Uuid) -> Result<Option<ConversionResult>>;
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

struct Entry {
    result: ConversionResult,
    stored_at: Instant,
}

/// Process-local store bounded by entry count with optional expiry.
///
/// The least recently read entry is evicted once `capacity` is reached.
pub struct InMemoryResultStore {
    entries: Mutex<LruCache<Uuid, Entry>>,
    ttl: Option<Duration>,
}

impl InMemoryResultStore {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
            ttl,
        }
    }

    fn expired(&self, entry: &Entry) -> bool {
        self.ttl
            .is_some_and(|ttl| entry.stored_at.elapsed() >= ttl)
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn insert(&self, id: Uuid, result: ConversionResult) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if let Some((evicted, _)) = entries.push(
            id,
            Entry {
                result,
                stored_at: Instant::now(),
            },
        ) && evicted != id
        {
            tracing::debug!("Result cache full, evicted {}", evicted);
        }
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<ConversionResult>> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(id) {
            Some(entry) if !self.expired(entry) => return Ok(Some(entry.result.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(id);
            tracing::debug!("Result {} expired", id);
        }
        Ok(None)
    }

    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tag: &str) -> ConversionResult {
        ConversionResult {
            pseudocode: format!("pseudo {tag}"),
            explanation: format!("explain {tag}"),
            flowchart: "<svg/>".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_then_get_returns_same_record() {
        let store = InMemoryResultStore::new(8, None);
        let id = Uuid::new_v4();
        store.insert(id, sample("a")).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), Some(sample("a")));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let store = InMemoryResultStore::new(8, None);
        assert!(store.get(&Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recently_used() {
        let store = InMemoryResultStore::new(2, None);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        store.insert(a, sample("a")).await.unwrap();
        store.insert(b, sample("b")).await.unwrap();
        // touch a so b becomes the eviction candidate
        assert!(store.get(&a).await.unwrap().is_some());
        store.insert(c, sample("c")).await.unwrap();

        assert!(store.get(&a).await.unwrap().is_some());
        assert!(store.get(&b).await.unwrap().is_none());
        assert!(store.get(&c).await.unwrap().is_some());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_read() {
        let store = InMemoryResultStore::new(8, Some(Duration::from_millis(20)));
        let id = Uuid::new_v4();
        store.insert(id, sample("a")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.get(&id).await.unwrap().is_none());
        assert_eq!(store.len().await, 0);
    }

    #[test]
    fn wire_format_has_exactly_three_fields() {
        let value = serde_json::to_value(sample("a")).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert!(obj.contains_key("pseudocode"));
        assert!(obj.contains_key("explanation"));
        assert!(obj.contains_key("flowchart"));
    }
}
