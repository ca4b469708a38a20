//! Backend selection.

use crate::config::{CacheBackend, CacheConfig};
use crate::driver::Driver;
use crate::error::{CacheError, CacheResult};
use crate::memcached_driver::MemcachedDriver;
use crate::memory::MemoryDriver;
#[cfg(feature = "redis")]
use crate::redis_driver::RedisDriver;
use crate::serializer::Serializer;
use crate::tagset::TagSet;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tagcache_log::debug;

/// One of the built-in drivers, chosen once from configuration.
#[derive(Debug)]
pub enum CacheDriver {
    Memory(MemoryDriver),
    #[cfg(feature = "redis")]
    Redis(RedisDriver),
    Memcached(MemcachedDriver),
}

impl CacheDriver {
    /// Validate `config` and build the driver it names.
    ///
    /// Naming a backend whose cargo feature is off is a configuration
    /// error.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagcache_core::*;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> CacheResult<()> {
    /// let cache = CacheDriver::connect(&CacheConfig::memory()).await?;
    /// assert_eq!(cache.name(), "memory");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        debug!("Building {} cache driver", config.backend);

        match config.backend {
            CacheBackend::Memory => Ok(Self::Memory(MemoryDriver::new(config)?)),
            #[cfg(feature = "redis")]
            CacheBackend::Redis => Ok(Self::Redis(RedisDriver::connect(config).await?)),
            #[cfg(not(feature = "redis"))]
            CacheBackend::Redis => Err(feature_disabled("redis")),
            #[cfg(feature = "memcached")]
            CacheBackend::Memcached => Ok(Self::Memcached(MemcachedDriver::connect(config).await?)),
            #[cfg(not(feature = "memcached"))]
            CacheBackend::Memcached => Err(feature_disabled("memcached")),
        }
    }

    /// Backend this driver talks to.
    pub fn backend(&self) -> CacheBackend {
        match self {
            Self::Memory(_) => CacheBackend::Memory,
            #[cfg(feature = "redis")]
            Self::Redis(_) => CacheBackend::Redis,
            Self::Memcached(_) => CacheBackend::Memcached,
        }
    }

    fn inner(&self) -> &dyn Driver {
        match self {
            Self::Memory(driver) => driver,
            #[cfg(feature = "redis")]
            Self::Redis(driver) => driver,
            Self::Memcached(driver) => driver,
        }
    }
}

#[allow(dead_code)]
fn feature_disabled(feature: &str) -> CacheError {
    CacheError::Config(format!(
        "the {} backend requires the '{}' cargo feature",
        feature, feature
    ))
}

impl From<MemoryDriver> for CacheDriver {
    fn from(driver: MemoryDriver) -> Self {
        Self::Memory(driver)
    }
}

#[cfg(feature = "redis")]
impl From<RedisDriver> for CacheDriver {
    fn from(driver: RedisDriver) -> Self {
        Self::Redis(driver)
    }
}

impl From<MemcachedDriver> for CacheDriver {
    fn from(driver: MemcachedDriver) -> Self {
        Self::Memcached(driver)
    }
}

#[async_trait]
impl Driver for CacheDriver {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn serializer(&self) -> &dyn Serializer {
        self.inner().serializer()
    }

    async fn get(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<Option<Value>> {
        self.inner().get(key, tags).await
    }

    async fn get_many(
        &self,
        keys: &[&str],
        tags: Option<&TagSet>,
    ) -> CacheResult<Vec<Option<Value>>> {
        self.inner().get_many(keys, tags).await
    }

    async fn put(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
        tags: Option<&TagSet>,
    ) -> CacheResult<()> {
        self.inner().put(key, value, ttl, tags).await
    }

    async fn put_many(
        &self,
        entries: &[(&str, Value)],
        ttl: Option<Duration>,
        tags: Option<&TagSet>,
    ) -> CacheResult<()> {
        self.inner().put_many(entries, ttl, tags).await
    }

    async fn increment(&self, key: &str, amount: i64, tags: Option<&TagSet>) -> CacheResult<i64> {
        self.inner().increment(key, amount, tags).await
    }

    async fn decrement(&self, key: &str, amount: i64, tags: Option<&TagSet>) -> CacheResult<i64> {
        self.inner().decrement(key, amount, tags).await
    }

    async fn forever(&self, key: &str, value: &Value, tags: Option<&TagSet>) -> CacheResult<()> {
        self.inner().forever(key, value, tags).await
    }

    async fn forget(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<()> {
        self.inner().forget(key, tags).await
    }

    async fn flush(&self, tags: Option<&TagSet>) -> CacheResult<()> {
        self.inner().flush(tags).await
    }

    async fn has(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<bool> {
        self.inner().has(key, tags).await
    }

    async fn dispose(&self) -> CacheResult<()> {
        self.inner().dispose().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_connect_memory() {
        let cache = CacheDriver::connect(&CacheConfig::memory()).await.unwrap();
        assert_eq!(cache.backend(), CacheBackend::Memory);
        assert_eq!(cache.name(), "memory");

        cache.put("k", &json!(1), None, None).await.unwrap();
        assert_eq!(cache.get("k", None).await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_connect_validates_config() {
        let config = CacheConfig::memory().with_sweep_interval(Duration::ZERO);
        assert!(matches!(
            CacheDriver::connect(&config).await,
            Err(CacheError::Config(_))
        ));

        let config = CacheConfig::redis("  ");
        assert!(matches!(
            CacheDriver::connect(&config).await,
            Err(CacheError::Config(_))
        ));
    }

    #[cfg(not(feature = "memcached"))]
    #[tokio::test]
    async fn test_disabled_backend_is_config_error() {
        let err = CacheDriver::connect(&CacheConfig::memcached("localhost:11211"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Config(msg) if msg.contains("memcached")));
    }

    #[tokio::test]
    async fn test_dispose_through_enum() {
        let cache: CacheDriver = MemoryDriver::new(&CacheConfig::memory()).unwrap().into();
        cache.dispose().await.unwrap();
        assert!(matches!(cache.has("k", None).await, Err(CacheError::Disposed)));
    }
}
