//! Process-local cache backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;

use super::traits::{CacheBackend, CacheStats};
use crate::error::CacheResult;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// DashMap-backed cache. Expiry is checked on read; [`Self::purge_expired`]
/// reclaims memory held by entries nobody reads again.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: DashMap<String, MemoryEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Run [`Self::purge_expired`] every `interval` until the handle is aborted.
    pub fn spawn_purge(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "Purged expired cache entries");
                }
            }
        })
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let value = self
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone());
        match value {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            None => {
                // Remove only if still expired; a concurrent set may have refreshed it.
                if self
                    .entries
                    .remove_if(key, |_, entry| entry.expires_at <= now)
                    .is_some()
                {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: Some(self.entries.len() as u64),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    #[tokio::test]
    async fn test_set_then_get() -> Result<(), CacheError> {
        let cache = InMemoryCacheBackend::new();
        cache.set("k", "v".to_string(), Duration::from_secs(60)).await?;
        assert_eq!(cache.get("k").await?, Some("v".to_string()));
        assert_eq!(cache.get("other").await?, None);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() -> Result<(), CacheError> {
        let cache = InMemoryCacheBackend::new();
        cache.set("k", "v".to_string(), Duration::ZERO).await?;
        assert_eq!(cache.get("k").await?, None);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().await.evictions, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() -> Result<(), CacheError> {
        let cache = InMemoryCacheBackend::new();
        cache.set("k", "old".to_string(), Duration::from_secs(60)).await?;
        cache.set("k", "new".to_string(), Duration::from_secs(60)).await?;
        assert_eq!(cache.get("k").await?, Some("new".to_string()));
        cache.delete("k").await?;
        assert_eq!(cache.get("k").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_purge_expired() -> Result<(), CacheError> {
        let cache = InMemoryCacheBackend::new();
        cache.set("stale", "v".to_string(), Duration::ZERO).await?;
        cache.set("fresh", "v".to_string(), Duration::from_secs(60)).await?;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        Ok(())
    }
}
