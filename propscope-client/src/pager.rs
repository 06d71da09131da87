//! Infinite-scroll pager.
//!
//! Holds the pages fetched so far for one filter. Changing the filter drops
//! them, cancels any in-flight fetch and bumps a generation counter; a
//! response that completes under an older generation is discarded.
//!
//! A fetch future that is dropped before it finishes (a caller-side timeout,
//! say) releases its slot: the pager sees the closed channel and the next
//! call starts afresh.

use std::sync::Arc;

use propscope_core::{
    AddressSearch, FilterKey, ListView, PageEnvelope, PageRequest, Property, PropertyPage,
};
use tokio::sync::{oneshot, Mutex};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::rest::{PageFetcher, PageQuery};
use crate::retry::RetryPolicy;

/// What a call to [`Pager::fetch_next_page`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// A page was appended.
    Fetched(PropertyPage),
    /// The last page said there is nothing more.
    Exhausted,
    /// Another fetch is running; nothing was started.
    InFlight,
    /// The filter changed or the fetch was cancelled while it ran; the
    /// response was discarded.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FilterState {
    filter: FilterKey,
    search: Option<AddressSearch>,
}

struct PagerState {
    current: FilterState,
    pages: Vec<PropertyPage>,
    generation: u64,
    in_flight: Option<oneshot::Sender<()>>,
}

impl PagerState {
    fn has_next_page(&self) -> bool {
        self.pages.last().map_or(true, |page| page.has_more)
    }

    /// A fetch holds the receiving half until it finishes or is dropped.
    fn is_fetching(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Drop the in-flight fetch, if any, and invalidate its response.
    fn abandon(&mut self) {
        self.generation += 1;
        // Dropping the sender wakes the fetch's select.
        self.in_flight = None;
    }
}

pub struct Pager {
    fetcher: Arc<dyn PageFetcher>,
    view: ListView,
    page_size: u32,
    retry: RetryPolicy,
    state: Mutex<PagerState>,
}

impl Pager {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        view: ListView,
        page_size: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetcher,
            view,
            page_size,
            retry,
            state: Mutex::new(PagerState {
                current: FilterState {
                    filter: FilterKey::default(),
                    search: None,
                },
                pages: Vec::new(),
                generation: 0,
                in_flight: None,
            }),
        }
    }

    /// Page size and retry policy taken from `config`.
    pub fn from_config(fetcher: Arc<dyn PageFetcher>, view: ListView, config: &ClientConfig) -> Self {
        Self::new(fetcher, view, config.page_size, config.retry.clone())
    }

    pub fn view(&self) -> ListView {
        self.view
    }

    /// Switch to a new filter. Returns `false` when the normalized filter is
    /// unchanged, in which case the loaded pages are kept.
    pub async fn set_filter(&self, filter: FilterKey, search: Option<AddressSearch>) -> bool {
        let next = FilterState { filter, search };
        let mut state = self.state.lock().await;
        if state.current == next {
            return false;
        }
        tracing::debug!(
            view = %self.view,
            city = %next.filter.city(),
            suburbs = next.filter.suburbs().len(),
            "Filter changed, resetting pages"
        );
        state.abandon();
        state.current = next;
        state.pages.clear();
        true
    }

    /// Abandon the in-flight fetch, keeping the pages already loaded.
    pub async fn cancel(&self) {
        let mut state = self.state.lock().await;
        if state.is_fetching() {
            state.abandon();
        }
    }

    /// Fetch the page after the last one loaded.
    pub async fn fetch_next_page(&self) -> Result<FetchOutcome, ClientError> {
        let (generation, query, mut cancelled) = {
            let mut state = self.state.lock().await;
            if state.is_fetching() {
                return Ok(FetchOutcome::InFlight);
            }
            if !state.has_next_page() {
                return Ok(FetchOutcome::Exhausted);
            }
            let page = PageRequest::new(state.pages.len() as u32, self.page_size);

            if !state.current.filter.has_city() {
                let empty = PageEnvelope::empty(page);
                state.pages.push(empty.clone());
                return Ok(FetchOutcome::Fetched(empty));
            }

            let (tx, rx) = oneshot::channel();
            state.in_flight = Some(tx);
            let query = PageQuery {
                view: self.view,
                filter: state.current.filter.clone(),
                search: state.current.search.clone(),
                page,
            };
            (state.generation, query, rx)
        };

        let result = tokio::select! {
            result = self.retry.run("fetch_page", || self.fetcher.fetch_page(&query)) => Some(result),
            _ = &mut cancelled => None,
        };

        let mut state = self.state.lock().await;
        if state.generation != generation {
            tracing::debug!(view = %self.view, page = query.page.page(), "Discarding stale page");
            return Ok(FetchOutcome::Stale);
        }
        state.in_flight = None;
        match result {
            Some(Ok(page)) => {
                state.pages.push(page.clone());
                Ok(FetchOutcome::Fetched(page))
            }
            Some(Err(e)) => Err(e),
            None => Ok(FetchOutcome::Stale),
        }
    }

    pub async fn has_next_page(&self) -> bool {
        let state = self.state.lock().await;
        !state.is_fetching() && state.has_next_page()
    }

    pub async fn is_fetching(&self) -> bool {
        self.state.lock().await.is_fetching()
    }

    pub async fn pages(&self) -> Vec<PropertyPage> {
        self.state.lock().await.pages.clone()
    }

    pub async fn page_count(&self) -> usize {
        self.state.lock().await.pages.len()
    }

    /// Every loaded row, in page order.
    pub async fn rows(&self) -> Vec<Property> {
        let state = self.state.lock().await;
        state
            .pages
            .iter()
            .flat_map(|page| page.data.iter().cloned())
            .collect()
    }

    /// Total reported by the most recent page.
    pub async fn total(&self) -> Option<u64> {
        self.state.lock().await.pages.last().map(|page| page.total)
    }
}
