//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Data source and cache reachability
//!
//! The cache is optional for serving traffic, so a failing cache only
//! degrades readiness.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use propscope_storage::{CacheStats, PropertySource};
use serde::{Deserialize, Serialize};

use crate::{cached_listings::ListingService, state::AppState};

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthDetails {
    pub data_source: ComponentHealth,
    pub cache: ComponentHealth,
    pub cache_backend: String,
    pub cache_usage: CacheUsage,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Hit/miss counters of the cache backend since startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheUsage {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<u64>,
}

impl From<CacheStats> for CacheUsage {
    fn from(stats: CacheStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            hit_rate: stats.hit_rate(),
            entries: stats.entry_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Public text for a failed cache probe.
const CACHE_UNREACHABLE: &str = "Cache backend unreachable";

impl ComponentHealth {
    /// The raw error is logged; only `public` reaches the response body.
    fn from_check<E: std::fmt::Display>(
        component: &'static str,
        result: Result<u64, E>,
        failed: HealthStatus,
        public: impl FnOnce(&E) -> String,
    ) -> Self {
        match result {
            Ok(latency) => Self {
                status: HealthStatus::Healthy,
                latency_ms: Some(latency),
                error: None,
            },
            Err(e) => {
                tracing::warn!(component, error = %e, "Health probe failed");
                Self {
                    status: failed,
                    latency_ms: None,
                    error: Some(public(&e)),
                }
            }
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping - Simple pong response
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is responding", body = String),
    ),
))]
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live - Process liveness check
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse),
    ),
))]
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready (possibly degraded)", body = HealthResponse),
        (status = 503, description = "Data source unreachable", body = HealthResponse),
    ),
))]
pub async fn readiness(
    State(listings): State<ListingService>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let source_check = {
        let start = Instant::now();
        listings
            .source()
            .ping()
            .await
            .map(|_| start.elapsed().as_millis() as u64)
    };
    let cache_check = {
        let start = Instant::now();
        listings
            .cache()
            .ping()
            .await
            .map(|_| start.elapsed().as_millis() as u64)
    };

    let data_source = ComponentHealth::from_check(
        "data_source",
        source_check,
        HealthStatus::Unhealthy,
        |e| e.public_message().to_string(),
    );
    let cache = ComponentHealth::from_check("cache", cache_check, HealthStatus::Degraded, |_| {
        CACHE_UNREACHABLE.to_string()
    });

    let overall_status = match (data_source.status, cache.status) {
        (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
        (HealthStatus::Healthy, _) => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    };

    if overall_status != HealthStatus::Healthy {
        tracing::warn!(
            data_source = ?data_source.error,
            cache = ?cache.error,
            "Readiness check not healthy"
        );
    }

    let response = HealthResponse {
        status: overall_status,
        message: None,
        details: Some(HealthDetails {
            data_source,
            cache,
            cache_backend: listings.cache().backend_name().to_string(),
            cache_usage: listings.cache().stats().await.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if overall_status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

#[cfg(test)]
mod tests {
    use super::*;
    use propscope_core::StoreError;

    #[test]
    fn test_health_response_serialization() -> Result<(), serde_json::Error> {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            message: Some("All systems operational".to_string()),
            details: None,
        };

        let json = serde_json::to_string(&response)?;
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(!json.contains("details"));
        Ok(())
    }

    #[test]
    fn test_component_health_from_failed_check() -> Result<(), serde_json::Error> {
        let component = ComponentHealth::from_check(
            "cache",
            Err::<u64, _>("Connection refused to 10.0.0.7:6379"),
            HealthStatus::Degraded,
            |_| CACHE_UNREACHABLE.to_string(),
        );

        let json = serde_json::to_string(&component)?;
        assert!(json.contains("\"status\":\"degraded\""));
        assert!(json.contains(CACHE_UNREACHABLE));
        assert!(!json.contains("10.0.0.7"));
        assert!(!json.contains("latency_ms"));
        Ok(())
    }

    #[test]
    fn test_source_failure_reports_public_message() {
        let err = StoreError::upstream("relation \"secret_table\" does not exist");
        let expected = err.public_message();
        let component = ComponentHealth::from_check(
            "data_source",
            Err::<u64, _>(err),
            HealthStatus::Unhealthy,
            |e| e.public_message().to_string(),
        );
        assert_eq!(component.status, HealthStatus::Unhealthy);
        assert_eq!(component.error.as_deref(), Some(expected));
    }
}
