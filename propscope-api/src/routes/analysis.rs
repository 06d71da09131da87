//! Database analysis statistics route.

use axum::{extract::State, routing::get, Json, Router};
use propscope_core::DatabaseAnalysisStats;

use crate::{cached_listings::ListingService, error::ApiResult, state::AppState};

/// GET /api/database-analysis - Latest per-region counts and forecast tiers
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/database-analysis",
    tag = "Analysis",
    responses(
        (status = 200, description = "Latest stats, or zeroed stats with a message", body = DatabaseAnalysisStats),
        (status = 500, description = "Data source failure", body = crate::error::ApiError),
    ),
))]
pub async fn database_analysis(
    State(listings): State<ListingService>,
) -> ApiResult<Json<DatabaseAnalysisStats>> {
    Ok(Json(listings.stats().await?))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/api/database-analysis", get(database_analysis))
}
