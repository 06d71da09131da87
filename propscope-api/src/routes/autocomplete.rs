//! Address autocomplete routes.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use propscope_core::{AddressSuggestion, ListView, SuggestQuery};
use serde::Deserialize;

use crate::{cached_listings::ListingService, error::ApiResult, state::AppState};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutocompleteParams {
    pub q: Option<String>,
    pub city: Option<String>,
}

impl AutocompleteParams {
    fn query(&self) -> Option<SuggestQuery> {
        SuggestQuery::new(self.q.as_deref().unwrap_or_default(), self.city.as_deref())
    }
}

/// GET /api/property/autocomplete - Address suggestions over properties
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/property/autocomplete",
    tag = "Autocomplete",
    params(
        ("q" = Option<String>, Query, description = "Address fragment, at least 2 characters"),
        ("city" = Option<String>, Query, description = "Restrict to one city"),
    ),
    responses(
        (status = 200, description = "Up to 10 suggestions, unique by address", body = Vec<AddressSuggestion>),
        (status = 500, description = "Data source failure", body = crate::error::ApiError),
    ),
))]
pub async fn property_autocomplete(
    State(listings): State<ListingService>,
    Query(params): Query<AutocompleteParams>,
) -> ApiResult<Json<Vec<AddressSuggestion>>> {
    Ok(Json(listings.suggest(ListView::Properties, params.query()).await?))
}

/// GET /api/forecast/autocomplete - Address suggestions over forecasts
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/forecast/autocomplete",
    tag = "Autocomplete",
    params(
        ("q" = Option<String>, Query, description = "Address fragment, at least 2 characters"),
        ("city" = Option<String>, Query, description = "Restrict to one city"),
    ),
    responses(
        (status = 200, description = "Up to 10 suggestions, unique by address", body = Vec<AddressSuggestion>),
        (status = 500, description = "Data source failure", body = crate::error::ApiError),
    ),
))]
pub async fn forecast_autocomplete(
    State(listings): State<ListingService>,
    Query(params): Query<AutocompleteParams>,
) -> ApiResult<Json<Vec<AddressSuggestion>>> {
    Ok(Json(listings.suggest(ListView::Forecast, params.query()).await?))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/property/autocomplete", get(property_autocomplete))
        .route("/api/forecast/autocomplete", get(forecast_autocomplete))
}
