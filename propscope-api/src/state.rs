//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use propscope_storage::{EnvelopeCache, PropertySource};

use crate::cached_listings::ListingService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Cache-fronted listing access. Holds the data source and cache handles.
    pub listings: ListingService,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(source: Arc<dyn PropertySource>, cache: EnvelopeCache) -> Self {
        Self {
            listings: ListingService::new(source, cache),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(ListingService, listings);
crate::impl_from_ref!(Instant, start_time);
