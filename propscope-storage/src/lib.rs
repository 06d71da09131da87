//! PropScope Storage - data source trait, mock source and response cache
//!
//! The Postgres implementation of [`PropertySource`] lives in
//! `propscope-api`, next to the connection pool it needs.

pub mod cache;
pub mod error;
pub mod mock;
pub mod source;

pub use cache::{
    CacheBackend, CacheKey, CacheKind, CacheLookup, CacheStats, CacheTtls, EnvelopeCache,
    InMemoryCacheBackend, RedisCacheBackend, RedisPolicy, CACHE_SCHEMA_VERSION,
};
pub use error::{CacheError, CacheResult};
pub use mock::{Fault, InMemoryPropertySource, SourceCalls};
pub use source::PropertySource;
