//! In-memory data source for tests and local development.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use propscope_core::{
    AddressSearch, AddressSuggestion, DatabaseAnalysisStats, ListQuery, ListView, Property,
    SortOrder, StoreError, SuggestQuery,
};
use tokio::sync::RwLock;

use crate::source::PropertySource;

/// Injected failure for the next and all following calls until cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Page and count queries time out.
    Timeout,
    /// Page and count queries fail with an upstream error.
    Upstream,
    /// Only the count query fails; pages still load.
    CountUnavailable,
}

/// Call counters, readable from tests.
#[derive(Debug, Default)]
pub struct SourceCalls {
    pub pages: AtomicUsize,
    pub counts: AtomicUsize,
    pub by_id: AtomicUsize,
    pub suggestions: AtomicUsize,
    pub stats: AtomicUsize,
}

impl SourceCalls {
    /// Total page and count queries issued.
    pub fn list_queries(&self) -> usize {
        self.pages.load(Ordering::SeqCst) + self.counts.load(Ordering::SeqCst)
    }
}

/// Property source backed by in-memory vectors, one per view.
#[derive(Debug, Default)]
pub struct InMemoryPropertySource {
    rows: RwLock<HashMap<ListView, Vec<Property>>>,
    stats: RwLock<Vec<DatabaseAnalysisStats>>,
    fault: RwLock<Option<Fault>>,
    calls: SourceCalls,
}

impl InMemoryPropertySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the source with rows for one view.
    pub fn with_rows(mut self, view: ListView, rows: Vec<Property>) -> Self {
        self.rows.get_mut().insert(view, rows);
        self
    }

    pub async fn insert(&self, view: ListView, property: Property) {
        self.rows.write().await.entry(view).or_default().push(property);
    }

    pub async fn record_stats(&self, stats: DatabaseAnalysisStats) {
        self.stats.write().await.push(stats);
    }

    pub async fn set_fault(&self, fault: Option<Fault>) {
        *self.fault.write().await = fault;
    }

    pub fn calls(&self) -> &SourceCalls {
        &self.calls
    }

    async fn check_fault(&self, operation: &str, counting: bool) -> Result<(), StoreError> {
        match *self.fault.read().await {
            Some(Fault::Timeout) => Err(StoreError::timeout(operation)),
            Some(Fault::Upstream) => Err(StoreError::upstream("injected failure")),
            Some(Fault::CountUnavailable) if counting => {
                Err(StoreError::upstream("count unavailable"))
            }
            _ => Ok(()),
        }
    }

    async fn matching(&self, query: &ListQuery) -> Vec<Property> {
        let rows = self.rows.read().await;
        let mut out: Vec<Property> = rows
            .get(&query.view())
            .map(|rows| rows.iter().filter(|p| matches_query(p, query)).cloned().collect())
            .unwrap_or_default();
        out.sort_by(|a, b| compare(query.order(), a, b));
        out
    }
}

fn matches_query(property: &Property, query: &ListQuery) -> bool {
    if property.city.as_deref() != Some(query.city()) {
        return false;
    }
    if let Some(suburbs) = query.suburb_filter() {
        match property.suburb.as_deref() {
            Some(suburb) if suburbs.iter().any(|s| s == suburb) => {}
            _ => return false,
        }
    }
    match query.search() {
        Some(search) => matches_search(property.address.as_deref(), search),
        None => true,
    }
}

fn matches_search(address: Option<&str>, search: &AddressSearch) -> bool {
    let Some(address) = address else {
        return false;
    };
    if search.is_exact() {
        address == search.text()
    } else {
        address.to_lowercase().contains(&search.text().to_lowercase())
    }
}

fn compare(order: SortOrder, a: &Property, b: &Property) -> CmpOrdering {
    match order {
        SortOrder::IdAscending => a.id.cmp(&b.id),
        SortOrder::ConfidenceDescending => {
            let by_score = match (a.confidence_score, b.confidence_score) {
                (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(CmpOrdering::Equal),
                (Some(_), None) => CmpOrdering::Less,
                (None, Some(_)) => CmpOrdering::Greater,
                (None, None) => CmpOrdering::Equal,
            };
            by_score.then_with(|| a.id.cmp(&b.id))
        }
    }
}

#[async_trait]
impl PropertySource for InMemoryPropertySource {
    async fn fetch_page(&self, query: &ListQuery) -> Result<Vec<Property>, StoreError> {
        self.calls.pages.fetch_add(1, Ordering::SeqCst);
        self.check_fault("page", false).await?;
        Ok(self
            .matching(query)
            .await
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect())
    }

    async fn count(&self, query: &ListQuery) -> Result<u64, StoreError> {
        self.calls.counts.fetch_add(1, Ordering::SeqCst);
        self.check_fault("count", true).await?;
        Ok(self.matching(query).await.len() as u64)
    }

    async fn fetch_by_id(&self, view: ListView, id: &str) -> Result<Option<Property>, StoreError> {
        self.calls.by_id.fetch_add(1, Ordering::SeqCst);
        self.check_fault("lookup", false).await?;
        let rows = self.rows.read().await;
        Ok(rows.get(&view).and_then(|rows| {
            rows.iter()
                .find(|p| p.id == id || p.property_url.as_deref() == Some(id))
                .cloned()
        }))
    }

    async fn suggest(
        &self,
        view: ListView,
        query: &SuggestQuery,
        limit: usize,
    ) -> Result<Vec<AddressSuggestion>, StoreError> {
        self.calls.suggestions.fetch_add(1, Ordering::SeqCst);
        self.check_fault("autocomplete", false).await?;
        let needle = query.text().to_lowercase();
        let rows = self.rows.read().await;
        let mut hits: Vec<&Property> = rows
            .get(&view)
            .map(|rows| {
                rows.iter()
                    .filter(|p| query.city().map_or(true, |c| p.city.as_deref() == Some(c)))
                    .filter(|p| {
                        p.address
                            .as_deref()
                            .is_some_and(|a| a.to_lowercase().contains(&needle))
                    })
                    .collect()
            })
            .unwrap_or_default();
        hits.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(hits
            .into_iter()
            .take(limit)
            .map(|p| AddressSuggestion {
                id: p.id.clone(),
                address: p.address.clone().unwrap_or_default(),
                suburb: p.suburb.clone(),
                city: p.city.clone(),
            })
            .collect())
    }

    async fn latest_stats(&self) -> Result<Option<DatabaseAnalysisStats>, StoreError> {
        self.calls.stats.fetch_add(1, Ordering::SeqCst);
        self.check_fault("stats", false).await?;
        Ok(self.stats.read().await.last().cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match *self.fault.read().await {
            Some(Fault::Timeout) | Some(Fault::Upstream) => {
                Err(StoreError::upstream("injected failure"))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propscope_core::{FilterKey, PageRequest};

    fn listing(id: &str, city: &str, suburb: &str, address: &str) -> Property {
        Property {
            city: Some(city.to_string()),
            suburb: Some(suburb.to_string()),
            address: Some(address.to_string()),
            ..Property::new(id)
        }
    }

    fn source() -> InMemoryPropertySource {
        InMemoryPropertySource::new().with_rows(
            ListView::Properties,
            vec![
                listing("c", "Wellington City", "Aro Valley", "3 Aro Street"),
                listing("a", "Wellington City", "Aro Valley", "1 Aro Street"),
                listing("b", "Wellington City", "Brooklyn", "2 Todman Street"),
                listing("d", "Auckland", "Ponsonby", "4 Ponsonby Road"),
            ],
        )
    }

    fn query(suburbs: &[&str], search: Option<AddressSearch>) -> Option<ListQuery> {
        ListQuery::build(
            ListView::Properties,
            &FilterKey::new("Wellington City", suburbs),
            search.as_ref(),
            PageRequest::new(0, 9),
        )
    }

    #[tokio::test]
    async fn test_filters_and_orders_by_id() -> Result<(), StoreError> {
        let source = source();
        let q = query(&["Aro Valley"], None).ok_or_else(|| StoreError::upstream("no query"))?;
        let page = source.fetch_page(&q).await?;
        let ids: Vec<&str> = page.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(source.count(&q).await?, 2);
        assert_eq!(source.calls().list_queries(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_address_search() -> Result<(), StoreError> {
        let source = source();
        let q = query(&[], AddressSearch::new("todman", false))
            .ok_or_else(|| StoreError::upstream("no query"))?;
        assert_eq!(source.count(&q).await?, 1);
        let exact = query(&[], AddressSearch::new("todman", true))
            .ok_or_else(|| StoreError::upstream("no query"))?;
        assert_eq!(source.count(&exact).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_forecast_order_nulls_last() -> Result<(), StoreError> {
        let scored = |id: &str, score: Option<f64>| Property {
            confidence_score: score,
            ..listing(id, "Wellington City", "Aro Valley", id)
        };
        let source = InMemoryPropertySource::new().with_rows(
            ListView::Forecast,
            vec![scored("a", None), scored("b", Some(0.4)), scored("c", Some(0.9)), scored("d", Some(0.9))],
        );
        let q = ListQuery::build(
            ListView::Forecast,
            &FilterKey::new("Wellington City", &[] as &[&str]),
            None,
            PageRequest::default(),
        )
        .ok_or_else(|| StoreError::upstream("no query"))?;
        let ids: Vec<String> = source.fetch_page(&q).await?.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["c", "d", "b", "a"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_lookup_by_url() -> Result<(), StoreError> {
        let mut with_url = listing("x", "Auckland", "Ponsonby", "9 Franklin Road");
        with_url.property_url = Some("https://example.com/p/9".to_string());
        let source = InMemoryPropertySource::new().with_rows(ListView::Properties, vec![with_url]);
        let found = source.fetch_by_id(ListView::Properties, "https://example.com/p/9").await?;
        assert_eq!(found.map(|p| p.id), Some("x".to_string()));
        assert!(source.fetch_by_id(ListView::Forecast, "x").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_count_fault_leaves_pages_working() -> Result<(), StoreError> {
        let source = source();
        source.set_fault(Some(Fault::CountUnavailable)).await;
        let q = query(&[], None).ok_or_else(|| StoreError::upstream("no query"))?;
        assert_eq!(source.fetch_page(&q).await?.len(), 3);
        assert!(source.count(&q).await.is_err());
        Ok(())
    }
}
