//! Listing query builder.
//!
//! Turns a validated filter into a [`ListQuery`]: the source-agnostic
//! description of one bounded page query and its matching count query.
//! Backends render it (SQL in the API crate, iterator filters in the mock
//! source) but never decide filtering or ordering themselves.

use serde::{Deserialize, Serialize};

use crate::filter::{AddressSearch, FilterKey, ListView, PageRequest};

/// Deterministic result ordering. Every variant ends in a unique key so that
/// page boundaries are stable across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// `id ASC`
    IdAscending,
    /// `confidence_score DESC NULLS LAST, id ASC`
    ConfidenceDescending,
}

impl SortOrder {
    pub fn for_view(view: ListView) -> Self {
        match view {
            ListView::Properties => SortOrder::IdAscending,
            ListView::Forecast => SortOrder::ConfidenceDescending,
        }
    }
}

/// A bounded range query plus the filters shared with its count query.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    view: ListView,
    city: String,
    suburbs: Vec<String>,
    search: Option<AddressSearch>,
    order: SortOrder,
    page: PageRequest,
}

impl ListQuery {
    /// Build the query for a browse request.
    ///
    /// Returns `None` when the filter has no city: such requests resolve to an
    /// empty page and must not reach the data source.
    pub fn build(
        view: ListView,
        filter: &FilterKey,
        search: Option<&AddressSearch>,
        page: PageRequest,
    ) -> Option<Self> {
        if !filter.has_city() {
            return None;
        }
        Some(Self {
            view,
            city: filter.city().to_string(),
            suburbs: filter.suburbs().to_vec(),
            search: search.cloned(),
            order: SortOrder::for_view(view),
            page,
        })
    }

    pub fn view(&self) -> ListView {
        self.view
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    /// Suburb membership filter, or `None` when all suburbs are included.
    pub fn suburb_filter(&self) -> Option<&[String]> {
        if self.suburbs.is_empty() {
            None
        } else {
            Some(&self.suburbs)
        }
    }

    pub fn search(&self) -> Option<&AddressSearch> {
        self.search.as_ref()
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn page(&self) -> PageRequest {
        self.page
    }

    /// Row offset of the window.
    pub fn offset(&self) -> u64 {
        self.page.offset()
    }

    /// Maximum rows in the window.
    pub fn limit(&self) -> u64 {
        self.page.page_size() as u64
    }

    /// Inclusive `[first, last]` row indices of the window.
    pub fn window(&self) -> (u64, u64) {
        (self.page.offset(), self.page.last_index())
    }
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
pub fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `%text%` pattern with wildcards in `text` escaped.
pub fn contains_pattern(text: &str) -> String {
    format!("%{}%", escape_like(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_city_builds_no_query() {
        let filter = FilterKey::new("  ", &["Aro Valley"]);
        assert!(ListQuery::build(ListView::Properties, &filter, None, PageRequest::default()).is_none());
    }

    #[test]
    fn test_window_matches_page() -> Result<(), String> {
        let filter = FilterKey::new("Wellington City", &["Aro Valley"]);
        let query = ListQuery::build(ListView::Properties, &filter, None, PageRequest::new(1, 9))
            .ok_or("query should build")?;
        assert_eq!(query.window(), (9, 17));
        assert_eq!(query.limit(), 9);
        assert_eq!(query.suburb_filter().map(|s| s.len()), Some(1));
        Ok(())
    }

    #[test]
    fn test_no_suburb_filter_when_all() -> Result<(), String> {
        let filter = FilterKey::new("Wellington City", &["", " "]);
        let query = ListQuery::build(ListView::Forecast, &filter, None, PageRequest::default())
            .ok_or("query should build")?;
        assert!(query.suburb_filter().is_none());
        assert_eq!(query.order(), SortOrder::ConfidenceDescending);
        Ok(())
    }

    #[test]
    fn test_like_escaping() {
        assert_eq!(contains_pattern("10%_off"), "%10\\%\\_off%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
