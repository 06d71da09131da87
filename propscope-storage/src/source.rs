//! Data source abstraction for listing queries.

use async_trait::async_trait;
use propscope_core::{
    AddressSuggestion, DatabaseAnalysisStats, ListQuery, ListView, Property, StoreError,
    SuggestQuery,
};

/// Read-only access to the listing relations.
///
/// Implementations execute the filters and ordering described by a
/// [`ListQuery`] verbatim. The Postgres client lives in the API crate; the
/// in-memory [`crate::InMemoryPropertySource`] backs tests.
#[async_trait]
pub trait PropertySource: Send + Sync {
    /// Rows inside the query's offset window, in the query's order.
    async fn fetch_page(&self, query: &ListQuery) -> Result<Vec<Property>, StoreError>;

    /// Total rows matching the query's filters, ignoring the window.
    async fn count(&self, query: &ListQuery) -> Result<u64, StoreError>;

    /// One record whose `id` or `property_url` equals `id`.
    async fn fetch_by_id(&self, view: ListView, id: &str) -> Result<Option<Property>, StoreError>;

    /// Address suggestions containing the query text, at most `limit` rows.
    async fn suggest(
        &self,
        view: ListView,
        query: &SuggestQuery,
        limit: usize,
    ) -> Result<Vec<AddressSuggestion>, StoreError>;

    /// Most recently recorded analysis row, if any.
    async fn latest_stats(&self) -> Result<Option<DatabaseAnalysisStats>, StoreError>;

    /// Cheap reachability probe used by readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
