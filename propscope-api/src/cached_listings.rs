//! Cached Listing Service
//!
//! Orchestrates one list request: validate, read the cache, and on a miss
//! run the page and count queries concurrently, assemble the envelope and
//! write it back. Cache failures never fail a request; data source failures
//! are returned to the route as [`StoreError`].

use std::sync::Arc;
use std::time::Duration;

use propscope_core::{
    dedupe_by_address, AddressSearch, AddressSuggestion, DatabaseAnalysisStats, FilterKey,
    ListQuery, ListView, Lookup, PageEnvelope, PageRequest, PropertyPage, StoreError,
    SuggestQuery, TotalKind, MAX_SUGGESTIONS,
};
use propscope_storage::{CacheKey, CacheLookup, EnvelopeCache, PropertySource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::task::TaskTracker;

use crate::telemetry::metrics;

/// Message attached to zeroed stats when no analysis row exists.
pub const STATS_UNAVAILABLE_MESSAGE: &str =
    "No database analysis has been recorded yet. Run update-stats to populate it.";

/// Rows requested from the source per autocomplete call, before dedupe.
const SUGGESTION_FETCH_FACTOR: usize = 3;

// ============================================================================
// LISTING SERVICE
// ============================================================================

/// Cache-fronted access to listings, suggestions and stats.
#[derive(Clone)]
pub struct ListingService {
    source: Arc<dyn PropertySource>,
    cache: EnvelopeCache,
    /// Detached cache writes, awaited on shutdown.
    writes: TaskTracker,
}

impl ListingService {
    pub fn new(source: Arc<dyn PropertySource>, cache: EnvelopeCache) -> Self {
        Self {
            source,
            cache,
            writes: TaskTracker::new(),
        }
    }

    pub fn source(&self) -> &Arc<dyn PropertySource> {
        &self.source
    }

    pub fn cache(&self) -> &EnvelopeCache {
        &self.cache
    }

    /// Serve a list request for `view`.
    pub async fn list(&self, view: ListView, lookup: Lookup) -> Result<PropertyPage, StoreError> {
        match lookup {
            Lookup::ById(id) => self.by_id(view, &id).await,
            Lookup::Browse {
                filter,
                search,
                page,
            } => self.browse(view, &filter, search.as_ref(), page).await,
        }
    }

    async fn by_id(&self, view: ListView, id: &str) -> Result<PropertyPage, StoreError> {
        let key = CacheKey::by_id(self.cache.schema(), view, id);
        if let Some(hit) = self.read::<PropertyPage>(&key).await {
            return Ok(hit);
        }

        let record = self.source.fetch_by_id(view, id).await?;
        let found = record.is_some();
        let envelope = PageEnvelope::single(record);
        if found {
            self.write_through(key, envelope.clone());
        }
        Ok(envelope)
    }

    async fn browse(
        &self,
        view: ListView,
        filter: &FilterKey,
        search: Option<&AddressSearch>,
        page: PageRequest,
    ) -> Result<PropertyPage, StoreError> {
        let Some(query) = ListQuery::build(view, filter, search, page) else {
            tracing::debug!(view = %view, "No city selected, returning empty page");
            return Ok(PageEnvelope::empty(page));
        };

        let key = CacheKey::listing(self.cache.schema(), view, filter, search, page);
        if let Some(hit) = self.read::<PropertyPage>(&key).await {
            return Ok(hit);
        }

        let (rows, total) = tokio::join!(self.source.fetch_page(&query), self.source.count(&query));
        let rows = rows?;
        let total = match total {
            Ok(total) => Some(total),
            Err(e) => {
                tracing::warn!(view = %view, key = %key, error = %e, "Count query failed, estimating hasMore");
                None
            }
        };

        let (envelope, total_kind) = PageEnvelope::assemble(rows, total, page);
        match total_kind {
            TotalKind::Exact => self.write_through(key, envelope.clone()),
            TotalKind::LowerBound => {
                tracing::debug!(key = %key, "Skipping cache write for page without exact total");
            }
        }
        Ok(envelope)
    }

    /// Address suggestions; `None` (query too short) yields an empty list
    /// without touching the source.
    pub async fn suggest(
        &self,
        view: ListView,
        query: Option<SuggestQuery>,
    ) -> Result<Vec<AddressSuggestion>, StoreError> {
        let Some(query) = query else {
            return Ok(Vec::new());
        };
        let rows = self
            .source
            .suggest(view, &query, MAX_SUGGESTIONS * SUGGESTION_FETCH_FACTOR)
            .await?;
        Ok(dedupe_by_address(rows))
    }

    /// Latest analysis stats, or zeroed stats with a message when none exist.
    /// Only recorded stats are cached.
    pub async fn stats(&self) -> Result<DatabaseAnalysisStats, StoreError> {
        let key = CacheKey::stats(self.cache.schema());
        if let Some(hit) = self.read::<DatabaseAnalysisStats>(&key).await {
            return Ok(hit);
        }

        match self.source.latest_stats().await? {
            Some(stats) => {
                self.write_through(key, stats.clone());
                Ok(stats)
            }
            None => Ok(DatabaseAnalysisStats::unavailable(STATS_UNAVAILABLE_MESSAGE)),
        }
    }

    /// Wait until detached cache writes have finished, up to `timeout`.
    /// Returns `false` if writes were still pending.
    pub async fn settle(&self, timeout: Duration) -> bool {
        // `wait` only resolves on a closed tracker; reopen so later writes
        // are still tracked.
        self.writes.close();
        let settled = tokio::time::timeout(timeout, self.writes.wait())
            .await
            .is_ok();
        self.writes.reopen();
        settled
    }

    async fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let lookup = self.cache.get::<T>(key).await;
        if let Some(metrics) = metrics() {
            metrics.record_cache_lookup(key.kind().as_str(), lookup.outcome());
        }
        if let CacheLookup::Hit(_) = lookup {
            tracing::debug!(key = %key, "Cache hit");
        }
        lookup.into_hit()
    }

    /// Store `value` without holding up the response.
    fn write_through<T>(&self, key: CacheKey, value: T)
    where
        T: Serialize + Send + Sync + 'static,
    {
        let cache = self.cache.clone();
        self.writes.spawn(async move {
            if let Err(e) = cache.put(&key, &value).await {
                tracing::warn!(key = %key, error = %e, "Cache write failed");
                if let Some(metrics) = metrics() {
                    metrics.record_cache_write_failure(key.kind().as_str());
                }
            }
        });
    }
}
