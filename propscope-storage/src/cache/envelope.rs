//! Typed, schema-checked access to the cache backend.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::key::{CacheKey, CacheTtls, CACHE_SCHEMA_VERSION};
use super::traits::{CacheBackend, CacheStats};
use crate::error::{CacheError, CacheResult};

/// Stored value: the payload tagged with the schema it was written under.
#[derive(Debug, Serialize, Deserialize)]
struct Stored<T> {
    schema: u32,
    envelope: T,
}

/// Result of a cache read. Anything but `Hit` sends the caller to the source.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
    /// A value was present but its schema tag or shape did not match.
    SchemaMismatch,
    /// The backend failed; treated as a miss.
    Error(CacheError),
}

impl<T> CacheLookup<T> {
    pub fn outcome(&self) -> &'static str {
        match self {
            CacheLookup::Hit(_) => "hit",
            CacheLookup::Miss => "miss",
            CacheLookup::SchemaMismatch => "schema_mismatch",
            CacheLookup::Error(_) => "error",
        }
    }

    pub fn into_hit(self) -> Option<T> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            _ => None,
        }
    }
}

/// Cache front used by the listing service.
#[derive(Clone)]
pub struct EnvelopeCache {
    backend: Arc<dyn CacheBackend>,
    schema: u32,
    ttls: CacheTtls,
}

impl EnvelopeCache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttls: CacheTtls) -> Self {
        Self::with_schema(backend, ttls, CACHE_SCHEMA_VERSION)
    }

    /// Use an explicit schema version instead of [`CACHE_SCHEMA_VERSION`].
    pub fn with_schema(backend: Arc<dyn CacheBackend>, ttls: CacheTtls, schema: u32) -> Self {
        Self {
            backend,
            schema,
            ttls,
        }
    }

    pub fn schema(&self) -> u32 {
        self.schema
    }

    pub fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> CacheLookup<T> {
        let raw = match self.backend.get(key.as_str()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return CacheLookup::Miss,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed");
                return CacheLookup::Error(e);
            }
        };
        match self.decode(&raw) {
            Some(value) => CacheLookup::Hit(value),
            None => {
                tracing::debug!(key = %key, schema = self.schema, "Ignoring cached value with stale schema");
                CacheLookup::SchemaMismatch
            }
        }
    }

    fn decode<T: DeserializeOwned>(&self, raw: &str) -> Option<T> {
        let value: JsonValue = serde_json::from_str(raw).ok()?;
        let schema = value.get("schema").and_then(JsonValue::as_u64)?;
        if schema != self.schema as u64 {
            return None;
        }
        serde_json::from_value::<Stored<T>>(value)
            .ok()
            .map(|stored| stored.envelope)
    }

    /// Overwrite the entry with the TTL of the key's kind.
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T) -> CacheResult<()> {
        let raw = serde_json::to_string(&Stored {
            schema: self.schema,
            envelope: value,
        })?;
        let ttl = self.ttls.for_kind(key.kind());
        self.backend.set(key.as_str(), raw, ttl).await
    }

    pub async fn ping(&self) -> CacheResult<()> {
        self.backend.ping().await
    }

    pub async fn stats(&self) -> CacheStats {
        self.backend.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemoryCacheBackend;
    use propscope_core::{FilterKey, ListView, PageEnvelope, PageRequest, Property};
    use std::time::Duration;

    fn listing_key(schema: u32) -> CacheKey {
        CacheKey::listing(
            schema,
            ListView::Properties,
            &FilterKey::new("Wellington City", &["Aro Valley"]),
            None,
            PageRequest::default(),
        )
    }

    fn envelope() -> PageEnvelope<Property> {
        PageEnvelope::assemble(vec![Property::new("a")], Some(1), PageRequest::default()).0
    }

    #[tokio::test]
    async fn test_put_then_hit() -> Result<(), CacheError> {
        let cache = EnvelopeCache::new(Arc::new(InMemoryCacheBackend::new()), CacheTtls::default());
        let key = listing_key(cache.schema());
        assert_eq!(cache.get::<PageEnvelope<Property>>(&key).await, CacheLookup::Miss);
        cache.put(&key, &envelope()).await?;
        assert_eq!(cache.get(&key).await, CacheLookup::Hit(envelope()));
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_schema_tag_is_mismatch() -> Result<(), CacheError> {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = EnvelopeCache::new(backend.clone(), CacheTtls::default());
        let key = listing_key(cache.schema());
        let stale = serde_json::json!({"schema": 1, "envelope": envelope()}).to_string();
        backend.set(key.as_str(), stale, Duration::from_secs(60)).await?;
        assert_eq!(
            cache.get::<PageEnvelope<Property>>(&key).await,
            CacheLookup::SchemaMismatch
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_shape_is_mismatch() -> Result<(), CacheError> {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cache = EnvelopeCache::new(backend.clone(), CacheTtls::default());
        let key = listing_key(cache.schema());
        let legacy = serde_json::json!({"schema": cache.schema(), "envelope": {"rows": []}}).to_string();
        backend.set(key.as_str(), legacy, Duration::from_secs(60)).await?;
        assert_eq!(
            cache.get::<PageEnvelope<Property>>(&key).await,
            CacheLookup::SchemaMismatch
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_entry_from_older_schema_is_never_read() -> Result<(), CacheError> {
        let backend: Arc<dyn CacheBackend> = Arc::new(InMemoryCacheBackend::new());
        let old = EnvelopeCache::with_schema(backend.clone(), CacheTtls::default(), 1);
        let new = EnvelopeCache::with_schema(backend, CacheTtls::default(), 2);
        old.put(&listing_key(1), &envelope()).await?;
        assert!(old.get::<PageEnvelope<Property>>(&listing_key(1)).await.into_hit().is_some());
        assert!(new.get::<PageEnvelope<Property>>(&listing_key(2)).await.into_hit().is_none());
        Ok(())
    }
}
