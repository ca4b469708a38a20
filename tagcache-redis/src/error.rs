//! Redis error types.

use thiserror::Error;

/// Result type for Redis setup operations.
pub type Result<T> = std::result::Result<T, RedisError>;

/// Errors raised while configuring or opening a Redis connection.
#[derive(Debug, Error)]
pub enum RedisError {
    /// Connection could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connecting took longer than the configured timeout.
    #[error("Connection timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Configuration could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Underlying Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl RedisError {
    /// Whether the error happened while reaching the server.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

impl From<serde_json::Error> for RedisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
