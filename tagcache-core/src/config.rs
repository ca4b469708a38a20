//! Cache configuration types.

use crate::error::{CacheError, CacheResult};
use crate::serializer::SerializerKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Cache backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// In-process map with a periodic expiration sweep
    Memory,
    /// Redis backend
    Redis,
    /// Memcached backend
    Memcached,
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheBackend::Memory => "memory",
            CacheBackend::Redis => "redis",
            CacheBackend::Memcached => "memcached",
        })
    }
}

impl FromStr for CacheBackend {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            "memcached" | "memcache" => Ok(CacheBackend::Memcached),
            other => Err(CacheError::Config(format!("unknown cache driver '{}'", other))),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache backend type
    pub backend: CacheBackend,

    /// Connection URL (unused by the memory backend)
    #[serde(default)]
    pub url: String,

    /// Prefix for every physical key, value and tag index alike
    #[serde(default)]
    pub namespace: Option<String>,

    /// Value codec
    #[serde(default)]
    pub serializer: SerializerKind,

    /// TTL applied by the repository when a write names none
    #[serde(default, with = "opt_duration_secs")]
    pub default_ttl: Option<Duration>,

    /// Memory backend sweep period
    #[serde(default = "default_sweep_interval", with = "duration_millis")]
    pub sweep_interval: Duration,

    /// Connection timeout
    #[serde(default = "default_connection_timeout", with = "duration_millis")]
    pub connection_timeout: Duration,

    /// Redis database number
    #[serde(default)]
    pub database: Option<u8>,

    /// Redis ACL username
    #[serde(default)]
    pub username: Option<String>,

    /// Redis password
    #[serde(default)]
    pub password: Option<String>,
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(5)
}

impl CacheConfig {
    fn with_backend(backend: CacheBackend, url: String) -> Self {
        Self {
            backend,
            url,
            namespace: None,
            serializer: SerializerKind::default(),
            default_ttl: None,
            sweep_interval: default_sweep_interval(),
            connection_timeout: default_connection_timeout(),
            database: None,
            username: None,
            password: None,
        }
    }

    /// In-process cache configuration.
    ///
    /// ```
    /// use tagcache_core::CacheConfig;
    /// use std::time::Duration;
    ///
    /// let config = CacheConfig::memory().with_sweep_interval(Duration::from_millis(250));
    /// assert_eq!(config.sweep_interval, Duration::from_millis(250));
    /// ```
    pub fn memory() -> Self {
        Self::with_backend(CacheBackend::Memory, String::new())
    }

    /// Redis cache configuration.
    ///
    /// ```
    /// use tagcache_core::CacheConfig;
    ///
    /// let config = CacheConfig::redis("redis://localhost:6379").with_namespace("app");
    /// assert_eq!(config.build_key("user:1"), "app:user:1");
    /// ```
    pub fn redis(url: impl Into<String>) -> Self {
        Self::with_backend(CacheBackend::Redis, url.into())
    }

    /// Memcached cache configuration.
    pub fn memcached(url: impl Into<String>) -> Self {
        Self::with_backend(CacheBackend::Memcached, url.into())
    }

    /// Load configuration from `TAGCACHE_*` environment variables.
    ///
    /// `TAGCACHE_DRIVER` selects the backend (default `memory`); an unknown
    /// driver or serializer name is an error.
    pub fn from_env() -> CacheResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> CacheResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("TAGCACHE_DRIVER") {
            Some(name) => name.parse()?,
            None => CacheBackend::Memory,
        };
        let mut config = Self::with_backend(backend, lookup("TAGCACHE_URL").unwrap_or_default());

        config.namespace = lookup("TAGCACHE_NAMESPACE").filter(|ns| !ns.is_empty());

        if let Some(name) = lookup("TAGCACHE_SERIALIZER") {
            config.serializer = name.parse()?;
        }

        if let Some(secs) = lookup("TAGCACHE_DEFAULT_TTL") {
            config.default_ttl = Some(Duration::from_secs(parse_number(
                "TAGCACHE_DEFAULT_TTL",
                &secs,
            )?));
        }

        if let Some(millis) = lookup("TAGCACHE_SWEEP_INTERVAL") {
            config.sweep_interval = Duration::from_millis(parse_number(
                "TAGCACHE_SWEEP_INTERVAL",
                &millis,
            )?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Decode a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> CacheResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CacheError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings the chosen backend depends on.
    pub fn validate(&self) -> CacheResult<()> {
        match self.backend {
            CacheBackend::Memory if self.sweep_interval.is_zero() => Err(CacheError::Config(
                "sweep interval must be greater than zero".to_string(),
            )),
            CacheBackend::Redis | CacheBackend::Memcached if self.url.trim().is_empty() => Err(
                CacheError::Config(format!("{} backend requires a URL", self.backend)),
            ),
            _ => Ok(()),
        }
    }

    /// Set the key namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the serializer.
    pub fn with_serializer(mut self, serializer: SerializerKind) -> Self {
        self.serializer = serializer;
        self
    }

    /// Set the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Set the memory sweep period.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Select the Redis database.
    pub fn with_database(mut self, database: u8) -> Self {
        self.database = Some(database);
        self
    }

    /// Set Redis credentials.
    pub fn with_credentials(mut self, username: Option<String>, password: impl Into<String>) -> Self {
        self.username = username;
        self.password = Some(password.into());
        self
    }

    /// Build the final key with namespace if configured.
    pub fn build_key(&self, key: &str) -> String {
        crate::driver::namespaced(self.namespace.as_deref(), key)
    }

    /// Redis connection settings derived from this configuration.
    #[cfg(feature = "redis")]
    pub fn redis_config(&self) -> tagcache_redis::RedisConfig {
        let mut config = tagcache_redis::RedisConfig::new(self.url.clone())
            .with_connection_timeout(self.connection_timeout);
        config.database = self.database;
        if let Some(password) = &self.password {
            config = config.with_credentials(self.username.clone(), password.clone());
        }
        config
    }
}

fn parse_number(name: &str, raw: &str) -> CacheResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| CacheError::Config(format!("{} must be a whole number, got '{}'", name, raw)))
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

mod opt_duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        duration.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_redis_config() {
        let config = CacheConfig::redis("redis://localhost:6379");
        assert_eq!(config.backend, CacheBackend::Redis);
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.serializer, SerializerKind::Json);
    }

    #[test]
    fn test_memcached_config() {
        let config = CacheConfig::memcached("memcache://localhost:11211");
        assert_eq!(config.backend, CacheBackend::Memcached);
        assert_eq!(config.url, "memcache://localhost:11211");
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::memory()
            .with_namespace("app")
            .with_default_ttl(Duration::from_secs(300))
            .with_serializer(SerializerKind::Raw);

        assert_eq!(config.namespace.as_deref(), Some("app"));
        assert_eq!(config.default_ttl, Some(Duration::from_secs(300)));
        assert_eq!(config.serializer, SerializerKind::Raw);
    }

    #[test]
    fn test_build_key() {
        assert_eq!(CacheConfig::memory().build_key("user:123"), "user:123");
        assert_eq!(
            CacheConfig::memory().with_namespace("myapp").build_key("user:123"),
            "myapp:user:123"
        );
    }

    #[test]
    fn test_backend_parse_and_display() {
        assert_eq!("Redis".parse::<CacheBackend>().unwrap(), CacheBackend::Redis);
        assert_eq!("memcache".parse::<CacheBackend>().unwrap(), CacheBackend::Memcached);
        assert_eq!(CacheBackend::Memory.to_string(), "memory");
        assert!(matches!(
            "mongodb".parse::<CacheBackend>(),
            Err(CacheError::Config(_))
        ));
    }

    #[test]
    fn test_from_lookup_defaults_to_memory() {
        let config = CacheConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, CacheBackend::Memory);
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert_eq!(config.namespace, None);
    }

    #[test]
    fn test_from_lookup_reads_everything() {
        let config = CacheConfig::from_lookup(lookup(&[
            ("TAGCACHE_DRIVER", "redis"),
            ("TAGCACHE_URL", "redis://cache:6379"),
            ("TAGCACHE_NAMESPACE", "shop"),
            ("TAGCACHE_SERIALIZER", "raw"),
            ("TAGCACHE_DEFAULT_TTL", "120"),
        ]))
        .unwrap();

        assert_eq!(config.backend, CacheBackend::Redis);
        assert_eq!(config.url, "redis://cache:6379");
        assert_eq!(config.namespace.as_deref(), Some("shop"));
        assert_eq!(config.serializer, SerializerKind::Raw);
        assert_eq!(config.default_ttl, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_from_lookup_rejects_bad_selection() {
        assert!(CacheConfig::from_lookup(lookup(&[("TAGCACHE_DRIVER", "mongo")])).is_err());
        assert!(CacheConfig::from_lookup(lookup(&[("TAGCACHE_SERIALIZER", "xml")])).is_err());
        assert!(CacheConfig::from_lookup(lookup(&[("TAGCACHE_DEFAULT_TTL", "soon")])).is_err());
        assert!(CacheConfig::from_lookup(lookup(&[("TAGCACHE_DRIVER", "redis")])).is_err());
    }

    #[test]
    fn test_from_json() {
        let config = CacheConfig::from_json(
            r#"{"backend":"memcached","url":"localhost:11211","default_ttl":30,"sweep_interval":500}"#,
        )
        .unwrap();
        assert_eq!(config.backend, CacheBackend::Memcached);
        assert_eq!(config.default_ttl, Some(Duration::from_secs(30)));
        assert_eq!(config.sweep_interval, Duration::from_millis(500));

        assert!(CacheConfig::from_json(r#"{"backend":"memory","sweep_interval":0}"#).is_err());
        assert!(CacheConfig::from_json(r#"{"backend":"couchdb"}"#).is_err());
    }

    #[cfg(feature = "redis")]
    #[test]
    fn test_redis_config_projection() {
        let config = CacheConfig::redis("redis://localhost:6379")
            .with_database(4)
            .with_credentials(None, "pw");
        let redis = config.redis_config();
        assert_eq!(redis.database, Some(4));
        assert_eq!(redis.password.as_deref(), Some("pw"));
        assert_eq!(redis.connection_url().unwrap(), "redis://:pw@localhost:6379/4");
    }
}
