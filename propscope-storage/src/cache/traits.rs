//! Cache backend trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

/// Pluggable string key-value store with per-entry expiry.
///
/// Values are opaque serialized payloads; typing and schema checks happen in
/// [`super::EnvelopeCache`]. Implementations must be safe to share across
/// request handlers.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Read a value. Expired entries read as `None`.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Overwrite a value with the given time to live.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Reachability probe.
    async fn ping(&self) -> CacheResult<()>;

    async fn stats(&self) -> CacheStats;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired entries included.
    pub misses: u64,
    /// Entries currently held, when the backend can tell.
    pub entry_count: Option<u64>,
    /// Entries dropped because they expired.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
