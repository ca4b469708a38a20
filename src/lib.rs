// tagcache - tag-aware caching for Rust
//
// Umbrella crate: re-exports the cache engine, the logging macros and, with
// the `redis` feature, the Redis connection helpers.

// Re-export core functionality
pub use tagcache_core::*;

// Re-export logging
pub use tagcache_log as log;

#[cfg(feature = "redis")]
pub use tagcache_redis as redis;

// Prelude for common imports
pub mod prelude {
    pub use tagcache_core::prelude::*;
    pub use tagcache_core::{MemcachedDriver, MemoryDriver, SerializerKind};

    #[cfg(feature = "redis")]
    pub use tagcache_core::RedisDriver;
}
