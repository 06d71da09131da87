//! PropScope Core - listing types
//!
//! Pure data structures and the pagination contract shared by the API
//! service, the storage layer and the client pager. No IO lives here.

pub mod error;
pub mod filter;
pub mod page;
pub mod property;
pub mod query;
pub mod stats;
pub mod suggest;

pub use error::{ConfigError, StoreError, NARROW_FILTER_GUIDANCE};
pub use filter::{
    normalize_suburbs, parse_suburbs, AddressSearch, FilterKey, ListView, Lookup, PageRequest,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use page::{has_more, PageEnvelope, TotalKind};
pub use property::Property;
pub use query::{contains_pattern, escape_like, ListQuery, SortOrder};
pub use stats::{tiers, DatabaseAnalysisStats, FORECAST_TIERS, STATS_REGIONS};
pub use suggest::{dedupe_by_address, AddressSuggestion, SuggestQuery, MAX_SUGGESTIONS, MIN_QUERY_LEN};

/// Property page as returned by the list endpoints.
pub type PropertyPage = PageEnvelope<Property>;
