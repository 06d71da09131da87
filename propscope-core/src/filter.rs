//! Filter identity for listing requests.
//!
//! A [`FilterKey`] is the normalized `{city, suburb-set}` pair. Two requests
//! naming the same suburbs in a different order, or with stray blanks, produce
//! equal keys and therefore share cache entries and client page sequences.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: u32 = 9;

/// Hard upper bound on records per page.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Which listing view a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ListView {
    /// Plain property listings, ordered by identifier.
    Properties,
    /// Sales forecast listings, ranked by descending confidence.
    Forecast,
}

impl ListView {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListView::Properties => "properties",
            ListView::Forecast => "forecast",
        }
    }
}

impl fmt::Display for ListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized `{city, suburb-set}` filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FilterKey {
    city: String,
    suburbs: Vec<String>,
}

impl FilterKey {
    /// Build a key, trimming the city and normalizing the suburb list.
    pub fn new<S: AsRef<str>>(city: &str, suburbs: &[S]) -> Self {
        Self {
            city: city.trim().to_string(),
            suburbs: normalize_suburbs(suburbs.iter().map(|s| s.as_ref())),
        }
    }

    /// Build a key from the comma-joined `suburbs` query parameter.
    pub fn from_params(city: Option<&str>, suburbs: Option<&str>) -> Self {
        Self {
            city: city.unwrap_or_default().trim().to_string(),
            suburbs: parse_suburbs(suburbs),
        }
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    /// Sorted, de-duplicated, non-blank suburbs. Empty means all suburbs.
    pub fn suburbs(&self) -> &[String] {
        &self.suburbs
    }

    /// A listing query needs a city; without one the result is empty.
    pub fn has_city(&self) -> bool {
        !self.city.is_empty()
    }

    pub fn is_all_suburbs(&self) -> bool {
        self.suburbs.is_empty()
    }
}

/// Split a comma-joined suburb parameter and normalize it.
pub fn parse_suburbs(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(raw) => normalize_suburbs(raw.split(',')),
        None => Vec::new(),
    }
}

/// Trim, drop blanks, sort and de-duplicate.
pub fn normalize_suburbs<'a>(suburbs: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = suburbs
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Zero-based page cursor with a bounded page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Clamp `page_size` into `[1, MAX_PAGE_SIZE]`.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Build from raw query-string values. Unparseable or negative numbers
    /// fall back to the defaults.
    pub fn from_params(page: Option<&str>, page_size: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 0)
            .map(|p| p.min(u32::MAX as i64) as u32)
            .unwrap_or(0);
        let page_size = page_size
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|s| *s > 0)
            .map(|s| s.min(MAX_PAGE_SIZE as i64) as u32)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self::new(page, page_size)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// First row index of this page.
    pub fn offset(&self) -> u64 {
        self.page as u64 * self.page_size as u64
    }

    /// Inclusive last row index of this page.
    pub fn last_index(&self) -> u64 {
        self.offset() + self.page_size as u64 - 1
    }

    /// The following page with the same size.
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            page_size: self.page_size,
        }
    }
}

/// Free-text address filter layered on a city-scoped listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressSearch {
    text: String,
    exact: bool,
}

impl AddressSearch {
    /// Returns `None` for blank search text.
    pub fn new(text: &str, exact: bool) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(Self {
                text: text.to_string(),
                exact,
            })
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }
}

/// How a listing request selects its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Fetch a single record by opaque identifier, ignoring every other filter.
    ById(String),
    /// City-scoped browse with optional suburb and address filters.
    Browse {
        filter: FilterKey,
        search: Option<AddressSearch>,
        page: PageRequest,
    },
}

impl Lookup {
    /// Resolve the lookup mode. A non-blank `id` always wins.
    pub fn resolve(
        id: Option<&str>,
        filter: FilterKey,
        search: Option<AddressSearch>,
        page: PageRequest,
    ) -> Self {
        match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => Lookup::ById(id.to_string()),
            None => Lookup::Browse {
                filter,
                search,
                page,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suburb_order_does_not_matter() {
        let a = FilterKey::new("Wellington City", &["Aro Valley", "Brooklyn"]);
        let b = FilterKey::new("Wellington City", &["Brooklyn", "Aro Valley"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_blank_suburbs_are_dropped() {
        let key = FilterKey::from_params(Some(" Wellington City "), Some(",Aro Valley, ,"));
        assert_eq!(key.city(), "Wellington City");
        assert_eq!(key.suburbs(), &["Aro Valley".to_string()]);

        let all = FilterKey::from_params(Some("Wellington City"), Some(""));
        assert!(all.is_all_suburbs());
    }

    #[test]
    fn test_duplicate_suburbs_collapse() {
        let key = FilterKey::new("Auckland", &["Ponsonby", "Ponsonby ", "Grey Lynn"]);
        assert_eq!(key.suburbs().len(), 2);
    }

    #[test]
    fn test_page_request_defaults_and_caps() {
        let req = PageRequest::from_params(None, None);
        assert_eq!(req.page(), 0);
        assert_eq!(req.page_size(), DEFAULT_PAGE_SIZE);

        let req = PageRequest::from_params(Some("3"), Some("500"));
        assert_eq!(req.page(), 3);
        assert_eq!(req.page_size(), MAX_PAGE_SIZE);

        let req = PageRequest::from_params(Some("-1"), Some("abc"));
        assert_eq!(req.page(), 0);
        assert_eq!(req.page_size(), DEFAULT_PAGE_SIZE);

        let req = PageRequest::new(0, 0);
        assert_eq!(req.page_size(), 1);
    }

    #[test]
    fn test_offset_window() {
        let req = PageRequest::new(2, 9);
        assert_eq!(req.offset(), 18);
        assert_eq!(req.last_index(), 26);
        assert_eq!(req.next().page(), 3);
    }

    #[test]
    fn test_id_lookup_takes_priority() {
        let lookup = Lookup::resolve(
            Some("abc"),
            FilterKey::new("Auckland", &["Ponsonby"]),
            None,
            PageRequest::default(),
        );
        assert_eq!(lookup, Lookup::ById("abc".to_string()));

        let lookup = Lookup::resolve(
            Some("  "),
            FilterKey::new("Auckland", &[] as &[&str]),
            None,
            PageRequest::default(),
        );
        assert!(matches!(lookup, Lookup::Browse { .. }));
    }

    #[test]
    fn test_blank_search_is_none() {
        assert!(AddressSearch::new("   ", false).is_none());
        let search = AddressSearch::new(" Aro St ", true);
        assert_eq!(search.as_ref().map(|s| s.text()), Some("Aro St"));
    }
}
