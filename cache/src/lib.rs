//! # Result Cache
//!
//! Content-addressed cache of check results with TTL expiry, backed by Redis
//! or a bounded in-process map.

pub mod backend;
pub mod memory;
pub mod redis_backend;
pub mod result_cache;

pub use backend::{CacheBackend, CacheEntry};
pub use memory::InMemoryCacheBackend;
pub use redis_backend::RedisCacheBackend;
pub use result_cache::{CacheStats, ResultCache};
