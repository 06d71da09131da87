//! Redis cache backend.
//!
//! One multiplexed connection is opened lazily and shared by all callers. A
//! failed command drops it so the next call reconnects. Every command runs
//! under a deadline; a slow Redis degrades to cache misses instead of
//! stalling listing requests.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::traits::{CacheBackend, CacheStats};
use crate::error::{CacheError, CacheResult};

/// Key probed by [`CacheBackend::ping`]. Never written.
const PING_KEY: &str = "propscope:ping";

#[derive(Debug, Clone)]
pub struct RedisPolicy {
    /// Deadline for connecting and for each command.
    pub timeout: Duration,
}

impl Default for RedisPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(250),
        }
    }
}

pub struct RedisCacheBackend {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    policy: RedisPolicy,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RedisCacheBackend {
    /// Validate the URL. No connection is made until the first command.
    pub fn new(url: &str, policy: RedisPolicy) -> CacheResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Unavailable(format!("invalid redis url: {e}")))?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            policy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    async fn connection(&self) -> CacheResult<MultiplexedConnection> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = timeout(
            self.policy.timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| CacheError::Timeout {
            operation: "connect",
            timeout_ms: self.timeout_ms(),
        })??;
        tracing::debug!("Opened redis cache connection");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn reset(&self) {
        *self.connection.lock().await = None;
    }

    fn timeout_ms(&self) -> u64 {
        self.policy.timeout.as_millis() as u64
    }

    /// Run one command under the deadline, dropping the connection on failure.
    async fn run<T, F, Fut>(&self, operation: &'static str, command: F) -> CacheResult<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let conn = self.connection().await?;
        let result = match timeout(self.policy.timeout, command(conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::from(e)),
            Err(_) => Err(CacheError::Timeout {
                operation,
                timeout_ms: self.timeout_ms(),
            }),
        };
        if let Err(e) = &result {
            if !matches!(e, CacheError::Command(_)) {
                self.reset().await;
            }
        }
        result
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let key = key.to_string();
        let value: Option<String> = self
            .run("get", |mut conn| async move { conn.get(key).await })
            .await?;
        let counter = if value.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let key = key.to_string();
        let seconds = ttl.as_secs().max(1);
        self.run("set", |mut conn| async move {
            conn.set_ex::<_, _, ()>(key, value, seconds).await
        })
        .await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let key = key.to_string();
        self.run("delete", |mut conn| async move {
            conn.del::<_, ()>(key).await
        })
        .await
    }

    async fn ping(&self) -> CacheResult<()> {
        self.run("ping", |mut conn| async move {
            conn.get::<_, Option<String>>(PING_KEY).await
        })
        .await
        .map(|_| ())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: None,
            evictions: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_rejected() {
        let result = RedisCacheBackend::new("not a url", RedisPolicy::default());
        assert!(matches!(result, Err(CacheError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error_not_a_panic() -> Result<(), CacheError> {
        let backend = RedisCacheBackend::new(
            "redis://127.0.0.1:1/",
            RedisPolicy {
                timeout: Duration::from_millis(200),
            },
        )?;
        assert!(backend.get("k").await.is_err());
        assert!(backend.ping().await.is_err());
        assert_eq!(backend.stats().await.hits, 0);
        Ok(())
    }
}
