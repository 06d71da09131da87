//! REST API Routes Module
//!
//! - Listing routes for properties and forecasts
//! - Address autocomplete
//! - Database analysis stats
//! - Health check endpoints (Kubernetes-compatible)
//! - CORS support for the browser dashboard
//! - Request deadline and a global concurrency limit

pub mod analysis;
pub mod autocomplete;
pub mod health;
pub mod listings;

use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    BoxError, Router,
};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

/// Handler for /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// LOAD SHEDDING
// ============================================================================

/// Turn errors from the tower layers into API errors.
async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        tracing::warn!("Request exceeded its deadline");
        ApiError::query_timeout().with_details(serde_json::json!({ "operation": "request" }))
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        ApiError::internal_error("Internal server error")
    }
}

// ============================================================================
// CORS
// ============================================================================

/// Build the CORS layer. No configured origins means any origin (dev mode).
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Build the full application router.
///
/// Production configurations are validated first; see
/// [`ApiConfig::validate`].
pub fn create_api_router(state: AppState, config: &ApiConfig) -> ApiResult<Router> {
    config.validate()?;

    let router = Router::new()
        .merge(listings::create_router())
        .merge(autocomplete::create_router())
        .merge(analysis::create_router())
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler));

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", get(openapi_json));

    // One semaphore shared by every route.
    let limits = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .layer(GlobalConcurrencyLimitLayer::new(config.max_concurrent_requests))
        .layer(TimeoutLayer::new(config.request_timeout()));

    let router = router
        .with_state(state)
        .layer(limits)
        .layer(from_fn(observability_middleware))
        .layer(build_cors_layer(config));

    Ok(router)
}
