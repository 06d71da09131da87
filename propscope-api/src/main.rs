//! PropScope API Server Entry Point
//!
//! Builds the Postgres pool, the cache backend and the Axum router, then
//! serves until Ctrl-C. Pending cache writes are awaited before exit.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use propscope_api::telemetry::{init_tracing, TelemetryConfig};
use propscope_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, CacheSettings, DbClient, DbConfig,
};
use propscope_storage::EnvelopeCache;

/// How long shutdown waits for detached cache writes.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let db_config = DbConfig::from_env()?;
    let db = DbClient::from_config(&db_config)?;
    tracing::info!(
        host = %db_config.host,
        dbname = %db_config.dbname,
        properties = db.relations().for_view(propscope_core::ListView::Properties),
        forecast = db.relations().for_view(propscope_core::ListView::Forecast),
        "Database configured"
    );

    let cache_settings = CacheSettings::from_env();
    let (backend, purge_task) = cache_settings.build_backend()?;
    let cache = EnvelopeCache::new(backend, cache_settings.ttls);

    let state = AppState::new(Arc::new(db), cache);
    let listings = state.listings.clone();

    let api_config = ApiConfig::from_env();
    let app: Router = create_api_router(state, &api_config)?;

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting PropScope API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    if !listings.settle(SHUTDOWN_GRACE).await {
        tracing::warn!("Cache writes still pending at shutdown");
    }
    if let Some(task) = purge_task {
        task.abort();
    }
    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("PROPSCOPE_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("PROPSCOPE_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str.parse::<u16>().map_err(|_| {
        ApiError::invalid_input(format!("Invalid port value: {}", port_str))
    })?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>().map_err(|e| {
        ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e))
    })
}
