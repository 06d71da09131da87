//! Response cache for listing, forecast and stats payloads.
//!
//! Reads go through [`EnvelopeCache`], which tags every stored value with a
//! schema version and treats any value it cannot decode under the current
//! version as a miss. Backend failures are never fatal: a failed read is a
//! miss and a failed write is dropped by the caller after logging.
//!
//! Backends:
//! - [`InMemoryCacheBackend`]: DashMap with per-entry expiry.
//! - [`RedisCacheBackend`]: `GET` / `SET EX` over a shared multiplexed
//!   connection.

pub mod envelope;
pub mod key;
pub mod memory;
pub mod redis_backend;
pub mod traits;

pub use envelope::{CacheLookup, EnvelopeCache};
pub use key::{CacheKey, CacheKind, CacheTtls, ALL_SUBURBS, CACHE_PREFIX, CACHE_SCHEMA_VERSION};
pub use memory::InMemoryCacheBackend;
pub use redis_backend::{RedisCacheBackend, RedisPolicy};
pub use traits::{CacheBackend, CacheStats};
