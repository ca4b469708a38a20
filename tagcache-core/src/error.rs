//! Error types for cache operations.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis transport error, passed through unchanged
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Memcached transport error, passed through unchanged
    #[cfg(feature = "memcached")]
    #[error("Memcached error: {0}")]
    Memcached(#[from] memcache::MemcacheError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Stored value cannot take part in increment/decrement
    #[error("Invalid operand for key '{key}': {reason}")]
    InvalidOperand { key: String, reason: String },

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Driver was disposed
    #[error("Cache driver has been disposed")]
    Disposed,

    /// Generic error
    #[error("Cache error: {0}")]
    Other(String),
}

impl CacheError {
    pub(crate) fn invalid_operand(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidOperand {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the failure came from the storage backend's transport.
    pub fn is_backend_error(&self) -> bool {
        match self {
            #[cfg(feature = "redis")]
            Self::Redis(_) => true,
            #[cfg(feature = "memcached")]
            Self::Memcached(_) => true,
            Self::Connection(_) => true,
            _ => false,
        }
    }
}

#[cfg(feature = "redis")]
impl From<tagcache_redis::RedisError> for CacheError {
    fn from(err: tagcache_redis::RedisError) -> Self {
        match err {
            tagcache_redis::RedisError::Redis(e) => Self::Redis(e),
            tagcache_redis::RedisError::Config(msg) => Self::Config(msg),
            other => Self::Connection(other.to_string()),
        }
    }
}
