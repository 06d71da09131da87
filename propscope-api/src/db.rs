//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling via deadpool-postgres and the
//! [`PropertySource`] implementation that serves listings from it.
//!
//! Rows are read as `row_to_json` objects and deserialized with serde, so the
//! source relations may carry columns the API does not know about.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use once_cell::sync::Lazy;
use propscope_core::{
    AddressSuggestion, ConfigError, DatabaseAnalysisStats, ListQuery, ListView, Property,
    StoreError, SuggestQuery,
};
use propscope_storage::PropertySource;
use regex::Regex;
use serde_json::Value as JsonValue;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

use crate::config::env_or;
use crate::error::{ApiError, ApiResult};
use crate::sql::{self, Statement};
use crate::telemetry::metrics;

/// Optionally schema-qualified identifier: `name` or `schema.name`.
static RELATION_NAME: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$"));

// ============================================================================
// RELATIONS
// ============================================================================

/// Relation names resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relations {
    properties: String,
    forecast: String,
    stats: String,
    stats_source: String,
}

impl Default for Relations {
    fn default() -> Self {
        Self {
            properties: "properties_with_latest_status".to_string(),
            forecast: "property_forecasts_view".to_string(),
            stats: "database_analysis_stats".to_string(),
            stats_source: "properties_view".to_string(),
        }
    }
}

impl Relations {
    /// Validate and build. Names are interpolated into SQL, so anything that
    /// is not a plain identifier is rejected.
    pub fn new(
        properties: &str,
        forecast: &str,
        stats: &str,
        stats_source: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            properties: validate_relation("PROPSCOPE_PROPERTIES_RELATION", properties)?,
            forecast: validate_relation("PROPSCOPE_FORECAST_RELATION", forecast)?,
            stats: validate_relation("PROPSCOPE_STATS_RELATION", stats)?,
            stats_source: validate_relation("PROPSCOPE_STATS_SOURCE_RELATION", stats_source)?,
        })
    }

    /// Environment variables (defaults in parentheses):
    /// - `PROPSCOPE_PROPERTIES_RELATION` (properties_with_latest_status)
    /// - `PROPSCOPE_FORECAST_RELATION` (property_forecasts_view)
    /// - `PROPSCOPE_STATS_RELATION` (database_analysis_stats)
    /// - `PROPSCOPE_STATS_SOURCE_RELATION` (properties_view)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        Self::new(
            &var("PROPSCOPE_PROPERTIES_RELATION", &defaults.properties),
            &var("PROPSCOPE_FORECAST_RELATION", &defaults.forecast),
            &var("PROPSCOPE_STATS_RELATION", &defaults.stats),
            &var("PROPSCOPE_STATS_SOURCE_RELATION", &defaults.stats_source),
        )
    }

    /// Relation backing a list view.
    pub fn for_view(&self, view: ListView) -> &str {
        match view {
            ListView::Properties => &self.properties,
            ListView::Forecast => &self.forecast,
        }
    }

    pub fn stats(&self) -> &str {
        &self.stats
    }

    pub fn stats_source(&self) -> &str {
        &self.stats_source
    }
}

fn validate_relation(field: &str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    let pattern = RELATION_NAME.as_ref().map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: format!("identifier pattern failed to compile: {}", e),
    })?;
    if pattern.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "expected an identifier such as `name` or `schema.name`".to_string(),
        })
    }
}

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait for a pooled connection
    pub timeout: Duration,
    /// Server-side `statement_timeout`
    pub statement_timeout: Duration,
    /// Client-side deadline for one query, including pool wait
    pub query_timeout: Duration,
    pub relations: Relations,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "propscope".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
            statement_timeout: Duration::from_secs(8),
            query_timeout: Duration::from_secs(10),
            relations: Relations::default(),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: std::env::var("PROPSCOPE_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env_or("PROPSCOPE_DB_PORT", 5432),
            dbname: std::env::var("PROPSCOPE_DB_NAME").unwrap_or_else(|_| "propscope".to_string()),
            user: std::env::var("PROPSCOPE_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("PROPSCOPE_DB_PASSWORD").unwrap_or_default(),
            max_size: env_or("PROPSCOPE_DB_POOL_SIZE", 16),
            timeout: Duration::from_secs(env_or("PROPSCOPE_DB_TIMEOUT", 30)),
            statement_timeout: Duration::from_millis(env_or(
                "PROPSCOPE_DB_STATEMENT_TIMEOUT_MS",
                8_000,
            )),
            query_timeout: Duration::from_millis(env_or("PROPSCOPE_DB_QUERY_TIMEOUT_MS", 10_000)),
            relations: Relations::from_env()?,
        })
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.options = Some(format!(
            "-c statement_timeout={}",
            self.statement_timeout.as_millis()
        ));

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(self.max_size);
        pool_config.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::internal_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT
// ============================================================================

/// Pooled Postgres client serving the listing relations.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
    relations: Relations,
    query_timeout: Duration,
}

impl DbClient {
    pub fn new(pool: Pool, relations: Relations, query_timeout: Duration) -> Self {
        Self {
            pool,
            relations,
            query_timeout,
        }
    }

    /// Create a new database client from configuration. Connections are
    /// opened lazily on first use.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool, config.relations.clone(), config.query_timeout))
    }

    pub fn relations(&self) -> &Relations {
        &self.relations
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Run `work` under the query deadline and record its outcome.
    async fn timed<T, F>(&self, operation: &'static str, label: &str, work: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.query_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::timeout(operation)),
        };

        let status = match &result {
            Ok(_) => "success",
            Err(e) if e.is_timeout() => "timeout",
            Err(_) => "error",
        };
        if let Some(metrics) = metrics() {
            metrics.record_db_query(operation, label, status, start.elapsed().as_secs_f64());
        }
        if let Err(e) = &result {
            tracing::debug!(operation, view = label, error = %e, "Query failed");
        }
        result
    }

    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, StoreError> {
        let conn = self.pool.get().await.map_err(pool_error)?;
        conn.query(statement.sql.as_str(), &statement.params())
            .await
            .map_err(|e| pg_error("query", e))
    }

    async fn query_json(&self, statement: &Statement) -> Result<Vec<JsonValue>, StoreError> {
        self.query(statement)
            .await?
            .iter()
            .map(|row| row.try_get::<_, JsonValue>(0).map_err(|e| pg_error("decode", e)))
            .collect()
    }

    async fn query_count(&self, operation: &'static str, statement: &Statement) -> Result<u64, StoreError> {
        let rows = self.query(statement).await?;
        let row = rows
            .first()
            .ok_or_else(|| StoreError::upstream(format!("{} returned no rows", operation)))?;
        let count: i64 = row.try_get(0).map_err(|e| pg_error("decode", e))?;
        Ok(count.max(0) as u64)
    }

    /// Number of rows in the stats source relation for `region`.
    pub async fn count_region(&self, region: &str) -> Result<u64, StoreError> {
        let statement = sql::region_count(self.relations.stats_source(), region);
        self.timed("region_count", "stats", self.query_count("region_count", &statement))
            .await
    }

    /// Append a stats row.
    pub async fn insert_stats(&self, stats: &DatabaseAnalysisStats) -> Result<(), StoreError> {
        let statement = sql::insert_stats(self.relations.stats(), stats);
        self.timed("insert_stats", "stats", async {
            let conn = self.pool.get().await.map_err(pool_error)?;
            conn.execute(statement.sql.as_str(), &statement.params())
                .await
                .map_err(|e| pg_error("insert", e))?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl PropertySource for DbClient {
    async fn fetch_page(&self, query: &ListQuery) -> Result<Vec<Property>, StoreError> {
        let statement = sql::page(self.relations.for_view(query.view()), query);
        let rows = self
            .timed("page", query.view().as_str(), self.query_json(&statement))
            .await?;
        rows.into_iter().map(decode_property).collect()
    }

    async fn count(&self, query: &ListQuery) -> Result<u64, StoreError> {
        let statement = sql::count(self.relations.for_view(query.view()), query);
        self.timed("count", query.view().as_str(), self.query_count("count", &statement))
            .await
    }

    async fn fetch_by_id(&self, view: ListView, id: &str) -> Result<Option<Property>, StoreError> {
        let statement = sql::by_id(self.relations.for_view(view), id);
        let rows = self
            .timed("by_id", view.as_str(), self.query_json(&statement))
            .await?;
        rows.into_iter().next().map(decode_property).transpose()
    }

    async fn suggest(
        &self,
        view: ListView,
        query: &SuggestQuery,
        limit: usize,
    ) -> Result<Vec<AddressSuggestion>, StoreError> {
        let statement = sql::suggest(self.relations.for_view(view), query, limit);
        let rows = self
            .timed("suggest", view.as_str(), self.query_json(&statement))
            .await?;
        rows.into_iter()
            .map(|row| {
                serde_json::from_value::<AddressSuggestion>(row)
                    .map_err(|e| StoreError::upstream(format!("malformed suggestion row: {}", e)))
            })
            .collect()
    }

    async fn latest_stats(&self) -> Result<Option<DatabaseAnalysisStats>, StoreError> {
        let statement = sql::latest_stats(self.relations.stats());
        let rows = self
            .timed("latest_stats", "stats", self.query_json(&statement))
            .await?;
        rows.into_iter()
            .next()
            .map(|row| {
                serde_json::from_value::<DatabaseAnalysisStats>(row)
                    .map_err(|e| StoreError::upstream(format!("malformed stats row: {}", e)))
            })
            .transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.timed("ping", "none", async {
            let conn = self.pool.get().await.map_err(pool_error)?;
            conn.simple_query("SELECT 1")
                .await
                .map_err(|e| pg_error("ping", e))?;
            Ok(())
        })
        .await
    }
}

fn decode_property(row: JsonValue) -> Result<Property, StoreError> {
    Property::from_row_json(row)
        .map_err(|e| StoreError::upstream(format!("malformed property row: {}", e)))
}

/// `57014 query_canceled` is what `statement_timeout` raises.
fn pg_error(operation: &str, err: tokio_postgres::Error) -> StoreError {
    if err.code() == Some(&SqlState::QUERY_CANCELED) {
        StoreError::timeout(operation)
    } else {
        StoreError::upstream(format!("{}: {}", operation, err))
    }
}

fn pool_error(err: deadpool_postgres::PoolError) -> StoreError {
    match err {
        deadpool_postgres::PoolError::Backend(e) => pg_error("connect", e),
        other => StoreError::upstream(format!("connection pool: {}", other)),
    }
}
