//! Prometheus Metrics Definitions
//!
//! Defines all PropScope metrics with their labels and exposes the
//! `/metrics` scrape endpoint.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Data source query latency buckets (seconds)
const DB_LATENCY_BUCKETS: &[f64] =
    &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance - initialized on first use
pub static METRICS: Lazy<ApiResult<PropscopeMetrics>> = Lazy::new(PropscopeMetrics::new);

/// Registered metrics, or `None` when registration failed (already logged).
pub fn metrics() -> Option<&'static PropscopeMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all PropScope metrics.
#[derive(Clone)]
pub struct PropscopeMetrics {
    /// HTTP request counter - labels: method, route, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, route
    pub http_request_duration_seconds: HistogramVec,

    /// Data source query counter - labels: operation, view, status
    pub db_queries_total: CounterVec,

    /// Data source query duration histogram - labels: operation, view
    pub db_query_duration_seconds: HistogramVec,

    /// Cache reads - labels: kind, outcome (hit/miss/schema_mismatch/error)
    pub cache_lookups_total: CounterVec,

    /// Dropped write-throughs - labels: kind
    pub cache_write_failures_total: CounterVec,
}

impl PropscopeMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        let metrics = Self {
            http_requests_total: register_counter_vec!(
                "propscope_http_requests_total",
                "Total number of HTTP requests",
                &["method", "route", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "propscope_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "route"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            db_queries_total: register_counter_vec!(
                "propscope_db_queries_total",
                "Total number of data source queries",
                &["operation", "view", "status"]
            )
            .map_err(|e| registration_error("db_queries_total", e))?,

            db_query_duration_seconds: register_histogram_vec!(
                "propscope_db_query_duration_seconds",
                "Data source query duration in seconds",
                &["operation", "view"],
                DB_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("db_query_duration_seconds", e))?,

            cache_lookups_total: register_counter_vec!(
                "propscope_cache_lookups_total",
                "Cache reads by outcome",
                &["kind", "outcome"]
            )
            .map_err(|e| registration_error("cache_lookups_total", e))?,

            cache_write_failures_total: register_counter_vec!(
                "propscope_cache_write_failures_total",
                "Cache writes that failed and were dropped",
                &["kind"]
            )
            .map_err(|e| registration_error("cache_write_failures_total", e))?,
        };
        Ok(metrics)
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, route, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration_secs);
    }

    /// Record a data source query. `status` is "success", "timeout" or "error".
    pub fn record_db_query(&self, operation: &str, view: &str, status: &str, duration_secs: f64) {
        self.db_queries_total
            .with_label_values(&[operation, view, status])
            .inc();
        self.db_query_duration_seconds
            .with_label_values(&[operation, view])
            .observe(duration_secs);
    }

    pub fn record_cache_lookup(&self, kind: &str, outcome: &str) {
        self.cache_lookups_total
            .with_label_values(&[kind, outcome])
            .inc();
    }

    pub fn record_cache_write_failure(&self, kind: &str) {
        self.cache_write_failures_total
            .with_label_values(&[kind])
            .inc();
    }
}

fn registration_error(name: &str, err: prometheus::Error) -> ApiError {
    tracing::error!(metric = name, error = %err, "Failed to register metric");
    ApiError::internal_error(format!("Failed to register {}: {}", name, err))
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
))]
pub async fn metrics_handler() -> impl IntoResponse {
    // Registration is lazy; make sure the families exist before gathering.
    let _ = metrics();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
