//! Tag-indexed caching over interchangeable backends.
//!
//! Entries can be grouped under one or more named tags and every entry
//! sharing a tag invalidated at once. The same [`Driver`] contract is
//! implemented by three backends:
//!
//! - [`MemoryDriver`] - in-process map with a periodic TTL sweep
//! - [`RedisDriver`] - native sets, `MULTI/EXEC` and a flush script
//! - [`MemcachedDriver`] - tag indexes kept as JSON arrays
//!
//! # Features
//!
//! - `redis` - Enable Redis support (enabled by default)
//! - `memcached` - Enable the Memcached client (requires explicit opt-in)
//! - `memcached-tls` - TLS for Memcached, pulls in openssl
//!
//! # Key layout
//!
//! A [`TagSet`] hashes its tag names into a reference namespace. A tagged
//! value lives at `<sha1 hex>:<key>` and each tag keeps an index of those
//! reference keys under `tags:<name>`. With a configured namespace every
//! physical key is prefixed with `<namespace>:`.
//!
//! # Examples
//!
//! ```
//! use tagcache_core::*;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> CacheResult<()> {
//! let cache = CacheDriver::connect(&CacheConfig::memory()).await?;
//! let users = TagSet::new(["users"]);
//!
//! cache
//!     .put("user:1", &json!({"name": "Ada"}), Some(Duration::from_secs(60)), Some(&users))
//!     .await?;
//! assert!(cache.has("user:1", Some(&users)).await?);
//! assert!(!cache.has("user:1", None).await?);
//!
//! cache.flush(Some(&users)).await?;
//! assert_eq!(cache.get("user:1", Some(&users)).await?, None);
//! # Ok(())
//! # }
//! ```
//!
//! ## Redis
//!
//! ```no_run
//! use tagcache_core::*;
//!
//! # async fn example() -> CacheResult<()> {
//! let cache = Repository::connect(&CacheConfig::redis("redis://localhost:6379")).await?;
//! cache.tags(["users", "admins"]).flush().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod memcached_driver;
pub mod memory;
pub mod repository;
pub mod serializer;
pub mod store;
pub mod tagset;

#[cfg(feature = "redis")]
pub mod redis_driver;

pub use config::{CacheBackend, CacheConfig};
pub use driver::Driver;
pub use error::{CacheError, CacheResult};
pub use memcached_driver::{MemcacheConnection, MemcachedDriver};
pub use memory::MemoryDriver;
pub use repository::{Repository, is_falsy};
pub use serializer::{JsonSerializer, RawSerializer, Serializer, SerializerKind};
pub use store::CacheDriver;
pub use tagset::{TAG_INDEX_PREFIX, TagSet};

#[cfg(feature = "redis")]
pub use redis_driver::RedisDriver;

#[cfg(feature = "memcached")]
pub use memcached_driver::MemcacheClient;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::config::{CacheBackend, CacheConfig};
    pub use crate::driver::Driver;
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::repository::Repository;
    pub use crate::store::CacheDriver;
    pub use crate::tagset::TagSet;
}
