//! OpenAPI document for the PropScope API
//!
//! Generated by utoipa from the route annotations and schema derives.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{CacheUsage, ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::{analysis, autocomplete, health, listings};
use crate::telemetry::metrics;

use propscope_core::{AddressSuggestion, DatabaseAnalysisStats, Property};

/// OpenAPI document for the PropScope API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "PropScope API",
        version = "0.1.0",
        description = "Paginated, cached property listings and sales forecasts",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Listings", description = "Paginated property and forecast listings"),
        (name = "Autocomplete", description = "Address suggestions"),
        (name = "Analysis", description = "Aggregate database statistics"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        listings::list_properties,
        listings::list_forecast,
        autocomplete::property_autocomplete,
        autocomplete::forecast_autocomplete,
        analysis::database_analysis,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError, ErrorCode,
            Property, AddressSuggestion, DatabaseAnalysisStats,
            HealthResponse, HealthStatus, HealthDetails, ComponentHealth, CacheUsage,
        )
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() -> Result<(), String> {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "PropScope API");

        let tags = openapi
            .tags
            .as_ref()
            .ok_or_else(|| "OpenAPI tags missing".to_string())?;
        assert_eq!(tags.len(), 5);

        for path in [
            "/api/property",
            "/api/forecast",
            "/api/property/autocomplete",
            "/api/database-analysis",
            "/health/ready",
            "/metrics",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing {path}");
        }
        Ok(())
    }

    #[test]
    fn test_to_json() -> Result<(), serde_json::Error> {
        let json = ApiDoc::to_json()?;
        assert!(json.contains("\"hasMore\""));
        Ok(())
    }
}
