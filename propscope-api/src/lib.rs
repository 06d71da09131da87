//! PropScope API - REST layer for paginated, cached property listings
//!
//! Serves property and forecast listings out of Postgres through a
//! schema-versioned response cache (Redis or in-process), plus address
//! autocomplete, aggregate statistics, health checks and Prometheus metrics.

pub mod cached_listings;
pub mod config;
pub mod db;
pub mod error;
pub mod macros;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod sql;
pub mod state;
pub mod telemetry;

pub use cached_listings::{ListingService, STATS_UNAVAILABLE_MESSAGE};
pub use config::{ApiConfig, CacheSettings};
pub use db::{DbClient, DbConfig, Relations};
pub use error::{ApiError, ApiResult, ErrorCode};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
