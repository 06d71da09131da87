//! API Configuration Module
//!
//! CORS, environment and cache settings, loaded from environment variables
//! with defaults suitable for local development.

use std::sync::Arc;
use std::time::Duration;

use propscope_core::ConfigError;
use propscope_storage::{
    CacheBackend, CacheTtls, InMemoryCacheBackend, RedisCacheBackend, RedisPolicy,
};
use tokio::task::JoinHandle;

/// Parse an environment variable, falling back to `default` when it is unset
/// or unparseable.
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Deployment environment name.
    pub environment: String,

    /// Deadline for a whole request, including queued time.
    pub request_timeout_secs: u64,

    /// Requests served at once across all routes; the rest wait.
    pub max_concurrent_requests: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            environment: "development".to_string(),
            request_timeout_secs: 30,
            max_concurrent_requests: 512,
        }
    }
}

impl ApiConfig {
    /// Environment variables:
    /// - `PROPSCOPE_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `PROPSCOPE_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `PROPSCOPE_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `PROPSCOPE_ENVIRONMENT`: deployment name (default: development)
    /// - `PROPSCOPE_REQUEST_TIMEOUT_SECS`: per-request deadline (default: 30)
    /// - `PROPSCOPE_MAX_CONCURRENT_REQUESTS`: in-flight request cap (default: 512)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("PROPSCOPE_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("PROPSCOPE_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs: env_or("PROPSCOPE_CORS_MAX_AGE_SECS", 86400),
            environment: std::env::var("PROPSCOPE_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            request_timeout_secs: env_or("PROPSCOPE_REQUEST_TIMEOUT_SECS", 30),
            max_concurrent_requests: env_or("PROPSCOPE_MAX_CONCURRENT_REQUESTS", 512),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Limits must be non-zero; production deployments must name their
    /// allowed origins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PROPSCOPE_REQUEST_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PROPSCOPE_MAX_CONCURRENT_REQUESTS".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.is_production() && self.cors_origins.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "PROPSCOPE_CORS_ORIGINS".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Redis URL. `None` selects the in-process backend.
    pub redis_url: Option<String>,
    /// Per-command deadline for Redis.
    pub timeout: Duration,
    pub ttls: CacheTtls,
    /// How often the in-process backend drops expired entries.
    pub purge_interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            timeout: Duration::from_millis(250),
            ttls: CacheTtls::default(),
            purge_interval: Duration::from_secs(300),
        }
    }
}

impl CacheSettings {
    /// Environment variables:
    /// - `PROPSCOPE_REDIS_URL`: Redis URL; unset or blank uses the in-memory cache
    /// - `PROPSCOPE_CACHE_TIMEOUT_MS` (default: 250)
    /// - `PROPSCOPE_CACHE_TTL_LISTINGS_SECS` (default: 3600)
    /// - `PROPSCOPE_CACHE_TTL_FORECAST_SECS` (default: 86400)
    /// - `PROPSCOPE_CACHE_TTL_STATS_SECS` (default: 86400)
    pub fn from_env() -> Self {
        let defaults = CacheTtls::default();
        Self {
            redis_url: std::env::var("PROPSCOPE_REDIS_URL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            timeout: Duration::from_millis(env_or("PROPSCOPE_CACHE_TIMEOUT_MS", 250)),
            ttls: CacheTtls {
                listings: Duration::from_secs(env_or(
                    "PROPSCOPE_CACHE_TTL_LISTINGS_SECS",
                    defaults.listings.as_secs(),
                )),
                forecast: Duration::from_secs(env_or(
                    "PROPSCOPE_CACHE_TTL_FORECAST_SECS",
                    defaults.forecast.as_secs(),
                )),
                stats: Duration::from_secs(env_or(
                    "PROPSCOPE_CACHE_TTL_STATS_SECS",
                    defaults.stats.as_secs(),
                )),
            },
            purge_interval: Duration::from_secs(300),
        }
    }

    /// Construct the configured backend. The in-memory backend comes with its
    /// purge task, which the caller owns.
    pub fn build_backend(
        &self,
    ) -> Result<(Arc<dyn CacheBackend>, Option<JoinHandle<()>>), ConfigError> {
        match &self.redis_url {
            Some(url) => {
                let backend = RedisCacheBackend::new(
                    url,
                    RedisPolicy {
                        timeout: self.timeout,
                    },
                )
                .map_err(|e| ConfigError::InvalidValue {
                    field: "PROPSCOPE_REDIS_URL".to_string(),
                    value: redact_url(url),
                    reason: e.to_string(),
                })?;
                tracing::info!(url = %redact_url(url), "Using redis cache backend");
                Ok((Arc::new(backend), None))
            }
            None => {
                let backend = Arc::new(InMemoryCacheBackend::new());
                let purge = backend.spawn_purge(self.purge_interval);
                tracing::info!("Using in-memory cache backend");
                Ok((backend, Some(purge)))
            }
        }
    }
}

/// Strip credentials from a URL before logging it.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
