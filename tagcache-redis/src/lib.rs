//! # tagcache-redis
//!
//! Redis connection setup shared by the tagcache drivers: a serde-friendly
//! [`RedisConfig`] with environment loading and URL assembly, and [`connect`],
//! which opens the one managed connection a driver owns.
//!
//! ```rust,ignore
//! use tagcache_redis::{RedisConfig, connect};
//!
//! let config = RedisConfig::from_env()?.with_database(1);
//! let mut conn = connect(&config).await?;
//! let _: () = redis::cmd("SET").arg("k").arg("v").query_async(&mut conn).await?;
//! ```

mod config;
mod connection;
mod error;

pub use config::RedisConfig;
pub use connection::connect;
pub use error::{RedisError, Result};

// Re-export redis crate for convenience
pub use redis;
pub use redis::aio::ConnectionManager;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::config::RedisConfig;
    pub use crate::connection::connect;
    pub use crate::error::{RedisError, Result};
    pub use redis::AsyncCommands;
}
