//! Redis connection settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::{RedisError, Result};

/// Where and how a driver connects to Redis.
///
/// Credentials and database set here override anything embedded in `url`
/// when [`connection_url`](Self::connection_url) assembles the final URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// `redis://host:port` or `rediss://host:port`.
    pub url: String,
    /// Bound on connect plus handshake, in whole seconds when serialized.
    #[serde(with = "duration_secs", default = "default_connection_timeout")]
    pub connection_timeout: Duration,
    #[serde(default)]
    pub database: Option<u8>,
    /// ACL user; only sent together with a password.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Force `rediss://`.
    #[serde(default)]
    pub tls: bool,
    /// Sent with `CLIENT SETNAME` after connecting.
    #[serde(default)]
    pub connection_name: Option<String>,
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self::new("redis://localhost:6379")
    }
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connection_timeout: default_connection_timeout(),
            database: None,
            username: None,
            password: None,
            tls: false,
            connection_name: None,
        }
    }

    /// Decode a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read `REDIS_URL`, `REDIS_DATABASE`, `REDIS_USERNAME`,
    /// `REDIS_PASSWORD` and `REDIS_TLS`. Unset variables keep the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = lookup("REDIS_URL").map(Self::new).unwrap_or_default();

        if let Some(db) = lookup("REDIS_DATABASE") {
            let db = db.trim().parse().map_err(|_| {
                RedisError::Config(format!("REDIS_DATABASE must be 0-255, got '{}'", db))
            })?;
            config.database = Some(db);
        }
        config.username = lookup("REDIS_USERNAME");
        config.password = lookup("REDIS_PASSWORD");
        config.tls = lookup("REDIS_TLS").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        Ok(config)
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_database(mut self, database: u8) -> Self {
        self.database = Some(database);
        self
    }

    /// Set the password and, for Redis 6+ ACLs, the user.
    pub fn with_credentials(mut self, username: Option<String>, password: impl Into<String>) -> Self {
        self.username = username;
        self.password = Some(password.into());
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_connection_name(mut self, name: impl Into<String>) -> Self {
        self.connection_name = Some(name.into());
        self
    }

    /// The URL handed to the client, with credentials and database applied.
    pub fn connection_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| RedisError::Config(format!("invalid Redis URL '{}': {}", self.url, e)))?;

        match url.scheme() {
            "redis" | "rediss" => {}
            other => {
                return Err(RedisError::Config(format!(
                    "unsupported Redis URL scheme '{}'",
                    other
                )));
            }
        }

        if self.tls && url.scheme() == "redis" {
            url.set_scheme("rediss")
                .map_err(|_| RedisError::Config("cannot switch URL to rediss".to_string()))?;
        }

        if let Some(password) = &self.password {
            url.set_password(Some(password))
                .map_err(|_| RedisError::Config("URL cannot carry a password".to_string()))?;
            if let Some(username) = &self.username {
                url.set_username(username)
                    .map_err(|_| RedisError::Config("URL cannot carry a username".to_string()))?;
            }
        }

        if let Some(db) = self.database {
            url.set_path(&format!("/{}", db));
        }

        Ok(url.to_string())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
