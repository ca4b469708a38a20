//! High-level cache repository with convenience methods.

use crate::config::CacheConfig;
use crate::driver::Driver;
use crate::error::{CacheError, CacheResult};
use crate::store::CacheDriver;
use crate::tagset::TagSet;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tagcache_log::debug;

/// Convenience layer over a [`Driver`].
///
/// A repository optionally carries a [`TagSet`]; every call then runs
/// tag-scoped. [`tags`](Self::tags) derives such a scoped repository that
/// shares the same driver.
pub struct Repository<D: Driver = CacheDriver> {
    driver: Arc<D>,
    default_ttl: Option<Duration>,
    tags: Option<TagSet>,
}

impl<D: Driver> Clone for Repository<D> {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            default_ttl: self.default_ttl,
            tags: self.tags.clone(),
        }
    }
}

impl Repository<CacheDriver> {
    /// Build the configured driver and wrap it, taking the default TTL from
    /// `config`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagcache_core::*;
    /// use serde_json::json;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> CacheResult<()> {
    /// let cache = Repository::connect(&CacheConfig::memory()).await?;
    /// let users = cache.tags(["users"]);
    ///
    /// users.put("user:1", &json!({"name": "Ada"}), None).await?;
    /// assert!(users.has("user:1").await?);
    ///
    /// users.flush().await?;
    /// assert!(!users.has("user:1").await?);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        let driver = CacheDriver::connect(config).await?;
        let mut repository = Self::new(driver);
        repository.default_ttl = config.default_ttl;
        Ok(repository)
    }
}

impl<D: Driver> Repository<D> {
    /// Wrap a driver.
    pub fn new(driver: D) -> Self {
        Self::from_shared(Arc::new(driver))
    }

    /// Wrap a driver shared with other owners.
    pub fn from_shared(driver: Arc<D>) -> Self {
        Self {
            driver,
            default_ttl: None,
            tags: None,
        }
    }

    /// TTL applied by [`put`](Self::put) when the caller passes none.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Tag set this repository is scoped to, if any.
    pub fn tag_set(&self) -> Option<&TagSet> {
        self.tags.as_ref()
    }

    /// A repository over the same driver, scoped to `names`.
    pub fn tags<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            driver: self.driver.clone(),
            default_ttl: self.default_ttl,
            tags: Some(TagSet::new(names)),
        }
    }

    fn log_call(&self, operation: &str, key: &str) {
        match &self.tags {
            Some(tags) => debug!("{} {} {} tags={}", self.driver.name(), operation, key, tags),
            None => debug!("{} {} {}", self.driver.name(), operation, key),
        }
    }

    /// Stored value, or `fallback` when the stored value is absent or
    /// falsy (`null`, `false`, zero, empty string).
    ///
    /// Use [`get_value`](Self::get_value) to tell a stored `0` apart from a
    /// miss.
    pub async fn get(&self, key: &str, fallback: Value) -> CacheResult<Value> {
        self.log_call("get", key);
        match self.driver.get(key, self.tags.as_ref()).await? {
            Some(value) if !is_falsy(&value) => Ok(value),
            _ => Ok(fallback),
        }
    }

    /// Stored value, `None` only on a miss.
    pub async fn get_value(&self, key: &str) -> CacheResult<Option<Value>> {
        self.log_call("get", key);
        self.driver.get(key, self.tags.as_ref()).await
    }

    /// Stored value decoded into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.get_value(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| CacheError::Deserialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Several values in key order.
    pub async fn many(&self, keys: &[&str]) -> CacheResult<Vec<Option<Value>>> {
        debug!("{} get_many {} keys", self.driver.name(), keys.len());
        self.driver.get_many(keys, self.tags.as_ref()).await
    }

    pub async fn has(&self, key: &str) -> CacheResult<bool> {
        self.log_call("has", key);
        self.driver.has(key, self.tags.as_ref()).await
    }

    /// Store a value; `ttl` falls back to the default TTL.
    pub async fn put(&self, key: &str, value: &Value, ttl: Option<Duration>) -> CacheResult<()> {
        self.log_call("put", key);
        let ttl = ttl.or(self.default_ttl);
        self.driver.put(key, value, ttl, self.tags.as_ref()).await
    }

    /// Encode `value` and store it.
    pub async fn put_as<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let value =
            serde_json::to_value(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.put(key, &value, ttl).await
    }

    /// Store several values with one TTL.
    pub async fn put_many(&self, entries: &[(&str, Value)], ttl: Option<Duration>) -> CacheResult<()> {
        debug!("{} put_many {} keys", self.driver.name(), entries.len());
        let ttl = ttl.or(self.default_ttl);
        self.driver.put_many(entries, ttl, self.tags.as_ref()).await
    }

    /// Store only if nothing is stored yet. Returns whether it wrote.
    ///
    /// The check and the write are separate calls.
    pub async fn add(&self, key: &str, value: &Value, ttl: Option<Duration>) -> CacheResult<bool> {
        if self.has(key).await? {
            return Ok(false);
        }
        self.put(key, value, ttl).await?;
        Ok(true)
    }

    /// Store a value that never expires, ignoring the default TTL.
    pub async fn forever(&self, key: &str, value: &Value) -> CacheResult<()> {
        self.log_call("forever", key);
        self.driver.forever(key, value, self.tags.as_ref()).await
    }

    pub async fn increment(&self, key: &str, amount: i64) -> CacheResult<i64> {
        self.log_call("increment", key);
        self.driver.increment(key, amount, self.tags.as_ref()).await
    }

    pub async fn decrement(&self, key: &str, amount: i64) -> CacheResult<i64> {
        self.log_call("decrement", key);
        self.driver.decrement(key, amount, self.tags.as_ref()).await
    }

    /// Cached value, or the producer's value which is then stored with
    /// `ttl`.
    pub async fn remember<F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
    ) -> CacheResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<Value>>,
    {
        if let Some(value) = self.get_value(key).await? {
            return Ok(value);
        }

        let value = producer().await?;
        self.put(key, &value, ttl).await?;
        Ok(value)
    }

    /// Like [`remember`](Self::remember), storing without expiration.
    pub async fn remember_forever<F, Fut>(&self, key: &str, producer: F) -> CacheResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<Value>>,
    {
        if let Some(value) = self.get_value(key).await? {
            return Ok(value);
        }

        let value = producer().await?;
        self.forever(key, &value).await?;
        Ok(value)
    }

    /// Fetch a value and remove it.
    pub async fn pull(&self, key: &str) -> CacheResult<Option<Value>> {
        let value = self.get_value(key).await?;
        self.forget(key).await?;
        Ok(value)
    }

    pub async fn forget(&self, key: &str) -> CacheResult<()> {
        self.log_call("forget", key);
        self.driver.forget(key, self.tags.as_ref()).await
    }

    /// Remove everything under this repository's tags, or the whole store
    /// when it carries none.
    pub async fn flush(&self) -> CacheResult<()> {
        match &self.tags {
            Some(tags) => debug!("{} flush tags={}", self.driver.name(), tags),
            None => debug!("{} flush all", self.driver.name()),
        }
        self.driver.flush(self.tags.as_ref()).await
    }

    /// Release the driver. Affects every repository sharing it.
    pub async fn dispose(&self) -> CacheResult<()> {
        self.driver.dispose().await
    }
}

/// Values [`Repository::get`] treats as a miss.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
