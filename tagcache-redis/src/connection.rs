//! Opening the single managed connection a cache driver owns.

use redis::aio::ConnectionManager;
use tracing::{debug, info};

use crate::{RedisConfig, RedisError, Result};

/// Open a reconnecting connection and verify it with `PING`.
///
/// The whole handshake is bounded by `config.connection_timeout`.
pub async fn connect(config: &RedisConfig) -> Result<ConnectionManager> {
    let url = config.connection_url()?;
    debug!(url = %config.url, database = ?config.database, "Connecting to Redis");

    let client = redis::Client::open(url).map_err(|e| RedisError::Connection(e.to_string()))?;

    let handshake = async {
        let mut conn = ConnectionManager::new(client)
            .await
            .map_err(|e| RedisError::Connection(e.to_string()))?;

        if let Some(name) = &config.connection_name {
            let _: () = redis::cmd("CLIENT")
                .arg("SETNAME")
                .arg(name)
                .query_async(&mut conn)
                .await?;
        }

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| RedisError::Connection(e.to_string()))?;

        Ok::<_, RedisError>(conn)
    };

    let conn = tokio::time::timeout(config.connection_timeout, handshake)
        .await
        .map_err(|_| RedisError::Timeout(config.connection_timeout))??;

    info!(url = %config.url, "Redis connection established");
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_rejects_bad_url_before_dialing() {
        let config = RedisConfig::new("not a url");
        let err = connect(&config).await.unwrap_err();
        assert!(matches!(err, RedisError::Config(_)));
    }

    #[tokio::test]
    #[ignore]
    async fn test_connect_live() {
        let config = RedisConfig::new("redis://localhost:6379")
            .with_connection_timeout(Duration::from_secs(2))
            .with_connection_name("tagcache-test");
        let mut conn = connect(&config).await.unwrap();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await.unwrap();
        assert_eq!(pong, "PONG");
    }
}
