//! Property and forecast listing routes.
//!
//! Query parameters are taken as raw strings so that malformed numbers fall
//! back to defaults instead of rejecting the request.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use propscope_core::{
    AddressSearch, FilterKey, ListView, Lookup, PageEnvelope, PageRequest, Property,
};
use serde::Deserialize;

use crate::{cached_listings::ListingService, error::ApiResult, state::AppState};

/// Raw list query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub city: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    /// Comma-joined suburb names
    pub suburbs: Option<String>,
    pub search: Option<String>,
    pub exact: Option<String>,
    pub id: Option<String>,
}

impl ListParams {
    /// Resolve the parameters into a lookup. A non-blank `id` wins over every
    /// other filter.
    pub fn lookup(&self) -> Lookup {
        let filter = FilterKey::from_params(self.city.as_deref(), self.suburbs.as_deref());
        let search = self
            .search
            .as_deref()
            .and_then(|text| AddressSearch::new(text, is_truthy(self.exact.as_deref())));
        let page = PageRequest::from_params(self.page.as_deref(), self.page_size.as_deref());
        Lookup::resolve(self.id.as_deref(), filter, search, page)
    }
}

fn is_truthy(raw: Option<&str>) -> bool {
    raw.map(|s| matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/property - Paginated property listings
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/property",
    tag = "Listings",
    params(
        ("city" = Option<String>, Query, description = "Exact city match; empty returns an empty page"),
        ("page" = Option<u32>, Query, description = "Zero-based page index (default 0)"),
        ("pageSize" = Option<u32>, Query, description = "Rows per page (default 9, max 50)"),
        ("suburbs" = Option<String>, Query, description = "Comma-joined suburb names"),
        ("search" = Option<String>, Query, description = "Address search text"),
        ("exact" = Option<bool>, Query, description = "Match the address exactly"),
        ("id" = Option<String>, Query, description = "Fetch one record by id or listing URL"),
    ),
    responses(
        (status = 200, description = "Page of properties", body = PageEnvelope<Property>),
        (status = 500, description = "Query timed out or the data source failed", body = crate::error::ApiError),
    ),
))]
pub async fn list_properties(
    State(listings): State<ListingService>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<PageEnvelope<Property>>> {
    list(&listings, ListView::Properties, &params).await
}

/// GET /api/forecast - Paginated forecast listings, highest confidence first
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/forecast",
    tag = "Listings",
    params(
        ("city" = Option<String>, Query, description = "Exact city match; empty returns an empty page"),
        ("page" = Option<u32>, Query, description = "Zero-based page index (default 0)"),
        ("pageSize" = Option<u32>, Query, description = "Rows per page (default 9, max 50)"),
        ("suburbs" = Option<String>, Query, description = "Comma-joined suburb names"),
        ("search" = Option<String>, Query, description = "Address search text"),
        ("exact" = Option<bool>, Query, description = "Match the address exactly"),
        ("id" = Option<String>, Query, description = "Fetch one record by id or listing URL"),
    ),
    responses(
        (status = 200, description = "Page of forecasts", body = PageEnvelope<Property>),
        (status = 500, description = "Query timed out or the data source failed", body = crate::error::ApiError),
    ),
))]
pub async fn list_forecast(
    State(listings): State<ListingService>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<PageEnvelope<Property>>> {
    list(&listings, ListView::Forecast, &params).await
}

async fn list(
    listings: &ListingService,
    view: ListView,
    params: &ListParams,
) -> ApiResult<Json<PageEnvelope<Property>>> {
    let envelope = listings.list(view, params.lookup()).await?;
    Ok(Json(envelope))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/property", get(list_properties))
        .route("/api/properties", get(list_properties))
        .route("/api/forecast", get(list_forecast))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_wins_over_filters() {
        let params = ListParams {
            city: Some("Wellington City".to_string()),
            id: Some(" https://listing.example/1 ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            params.lookup(),
            Lookup::ById("https://listing.example/1".to_string())
        );
    }

    #[test]
    fn test_bad_numbers_fall_back_to_defaults() {
        let params = ListParams {
            city: Some("Wellington City".to_string()),
            page: Some("abc".to_string()),
            page_size: Some("-3".to_string()),
            ..Default::default()
        };
        match params.lookup() {
            Lookup::Browse { page, .. } => assert_eq!(page, PageRequest::default()),
            other => panic!("expected browse, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_flag() {
        assert!(is_truthy(Some("TRUE")));
        assert!(is_truthy(Some("1")));
        assert!(!is_truthy(Some("false")));
        assert!(!is_truthy(None));
    }
}
