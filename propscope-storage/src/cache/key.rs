//! Deterministic cache keys.
//!
//! Keys are built from the normalized filter, so suburb order and stray
//! blanks never produce distinct entries. Every component is URL-encoded
//! before joining, which keeps the `:` and `,` separators unambiguous.
//!
//! Format:
//! `propscope:v{schema}:{view}:city={city}:suburbs={a,b|*}[:q={mode}{text}]:page={n}:size={n}`

use std::fmt;
use std::time::Duration;

use propscope_core::{AddressSearch, FilterKey, ListView, PageRequest};
use urlencoding::encode;

/// Namespace shared by every key this service writes.
pub const CACHE_PREFIX: &str = "propscope";

/// Version of the cached envelope contract. Bump on any change to the
/// envelope shape or to what a key means.
pub const CACHE_SCHEMA_VERSION: u32 = 2;

/// Suburb component used when no suburb filter applies.
pub const ALL_SUBURBS: &str = "*";

/// What kind of payload a key addresses. Determines the expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Listings,
    Forecast,
    Stats,
}

impl CacheKind {
    pub fn for_view(view: ListView) -> Self {
        match view {
            ListView::Properties => CacheKind::Listings,
            ListView::Forecast => CacheKind::Forecast,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Listings => "listings",
            CacheKind::Forecast => "forecast",
            CacheKind::Stats => "stats",
        }
    }
}

/// Expiry per payload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub listings: Duration,
    pub forecast: Duration,
    pub stats: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            listings: Duration::from_secs(3600),
            forecast: Duration::from_secs(86_400),
            stats: Duration::from_secs(86_400),
        }
    }
}

impl CacheTtls {
    pub fn for_kind(&self, kind: CacheKind) -> Duration {
        match kind {
            CacheKind::Listings => self.listings,
            CacheKind::Forecast => self.forecast,
            CacheKind::Stats => self.stats,
        }
    }
}

/// A fully rendered cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
    kind: CacheKind,
}

impl CacheKey {
    /// Key for a browse page under the given schema version.
    pub fn listing(
        schema: u32,
        view: ListView,
        filter: &FilterKey,
        search: Option<&AddressSearch>,
        page: PageRequest,
    ) -> Self {
        let suburbs = if filter.is_all_suburbs() {
            ALL_SUBURBS.to_string()
        } else {
            filter
                .suburbs()
                .iter()
                .map(|s| encode(s).into_owned())
                .collect::<Vec<_>>()
                .join(",")
        };
        let mut key = format!(
            "{CACHE_PREFIX}:v{schema}:{view}:city={}:suburbs={suburbs}",
            encode(filter.city())
        );
        if let Some(search) = search {
            let mode = if search.is_exact() { "=" } else { "~" };
            key.push_str(&format!(":q={mode}{}", encode(search.text())));
        }
        key.push_str(&format!(":page={}:size={}", page.page(), page.page_size()));
        Self {
            key,
            kind: CacheKind::for_view(view),
        }
    }

    /// Key for a single-record lookup.
    pub fn by_id(schema: u32, view: ListView, id: &str) -> Self {
        Self {
            key: format!("{CACHE_PREFIX}:v{schema}:{view}:id={}", encode(id)),
            kind: CacheKind::for_view(view),
        }
    }

    /// Key for the latest analysis stats.
    pub fn stats(schema: u32) -> Self {
        Self {
            key: format!("{CACHE_PREFIX}:v{schema}:stats:latest"),
            kind: CacheKind::Stats,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> CacheKind {
        self.kind
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(city: &str, suburbs: &[&str], page: u32) -> CacheKey {
        CacheKey::listing(
            CACHE_SCHEMA_VERSION,
            ListView::Properties,
            &FilterKey::new(city, suburbs),
            None,
            PageRequest::new(page, 9),
        )
    }

    #[test]
    fn test_key_format() {
        let k = key("Wellington City", &["Aro Valley", "Brooklyn"], 1);
        assert_eq!(
            k.as_str(),
            "propscope:v2:properties:city=Wellington%20City:suburbs=Aro%20Valley,Brooklyn:page=1:size=9"
        );
        assert_eq!(k.kind(), CacheKind::Listings);
    }

    #[test]
    fn test_all_suburbs_sentinel() {
        let k = key("Auckland", &[" ", ""], 0);
        assert!(k.as_str().contains(":suburbs=*:"));
    }

    #[test]
    fn test_separators_in_values_are_encoded() {
        let a = key("A", &["x,y"], 0);
        let b = key("A", &["x", "y"], 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_search_mode_is_part_of_key() {
        let filter = FilterKey::new("Auckland", &[] as &[&str]);
        let fuzzy = AddressSearch::new("Queen St", false);
        let exact = AddressSearch::new("Queen St", true);
        let a = CacheKey::listing(2, ListView::Properties, &filter, fuzzy.as_ref(), PageRequest::default());
        let b = CacheKey::listing(2, ListView::Properties, &filter, exact.as_ref(), PageRequest::default());
        assert_ne!(a, b);
        assert!(a.as_str().contains(":q=~Queen%20St"));
    }

    #[test]
    fn test_schema_version_changes_key() {
        let filter = FilterKey::new("Auckland", &["Ponsonby"]);
        let v1 = CacheKey::listing(1, ListView::Forecast, &filter, None, PageRequest::default());
        let v2 = CacheKey::listing(2, ListView::Forecast, &filter, None, PageRequest::default());
        assert_ne!(v1, v2);
        assert_eq!(v1.kind(), CacheKind::Forecast);
    }

    #[test]
    fn test_default_ttls() {
        let ttls = CacheTtls::default();
        assert_eq!(ttls.for_kind(CacheKind::Listings), Duration::from_secs(3600));
        assert_eq!(ttls.for_kind(CacheKind::Forecast), Duration::from_secs(86_400));
        assert_eq!(ttls.for_kind(CacheKind::Stats), Duration::from_secs(86_400));
    }

    proptest! {
        #[test]
        fn prop_suburb_order_independent(
            mut suburbs in proptest::collection::vec("[A-Za-z ]{1,12}", 0..6),
        ) {
            let forward = key("Wellington City", &suburbs.iter().map(String::as_str).collect::<Vec<_>>(), 0);
            suburbs.reverse();
            let reversed = key("Wellington City", &suburbs.iter().map(String::as_str).collect::<Vec<_>>(), 0);
            prop_assert_eq!(forward, reversed);
        }
    }
}
