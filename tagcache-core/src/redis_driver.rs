//! Redis cache driver.
//!
//! Tag indexes are native Redis sets. Tagged writes and deletes run inside
//! `MULTI/EXEC` so a reference and its value change together; a tagged
//! flush runs as one server-side script.

use crate::config::CacheConfig;
use crate::driver::{Driver, apply_delta, effective_ttl, namespaced, ttl_seconds};
use crate::error::{CacheError, CacheResult};
use crate::serializer::Serializer;
use crate::tagset::{TagSet, resolve_key};
use async_trait::async_trait;
use redis::{AsyncCommands, Pipeline, Script, aio::ConnectionManager};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tagcache_log::{debug, info};

/// Deletes every reference indexed under `KEYS`, then the indexes.
///
/// `ARGV[1]` is the physical key prefix prepended to each reference.
/// Returns the number of distinct references removed.
const FLUSH_TAGS_SCRIPT: &str = r#"
local prefix = ARGV[1]
local references = redis.call('SUNION', unpack(KEYS))
for _, reference in ipairs(references) do
    redis.call('DEL', prefix .. reference)
end
redis.call('DEL', unpack(KEYS))
return #references
"#;

/// Driver backed by one managed Redis connection.
pub struct RedisDriver {
    connection: parking_lot::Mutex<Option<ConnectionManager>>,
    serializer: Arc<dyn Serializer>,
    namespace: Option<String>,
    flush_script: Script,
}

impl RedisDriver {
    /// Connect using the Redis settings in `config`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tagcache_core::*;
    ///
    /// # async fn example() -> CacheResult<()> {
    /// let config = CacheConfig::redis("redis://localhost:6379").with_namespace("app");
    /// let driver = RedisDriver::connect(&config).await?;
    /// driver.flush(Some(&TagSet::new(["users"]))).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        let connection = tagcache_redis::connect(&config.redis_config()).await?;
        info!("Redis cache driver connected to {}", config.url);
        Ok(Self::with_connection(connection, config))
    }

    /// Wrap an already established connection.
    pub fn with_connection(connection: ConnectionManager, config: &CacheConfig) -> Self {
        Self {
            connection: parking_lot::Mutex::new(Some(connection)),
            serializer: config.serializer.build(),
            namespace: config.namespace.clone(),
            flush_script: Script::new(FLUSH_TAGS_SCRIPT),
        }
    }

    /// A handle to the shared connection.
    pub fn connection(&self) -> CacheResult<ConnectionManager> {
        self.connection.lock().clone().ok_or(CacheError::Disposed)
    }

    fn key(&self, key: &str) -> String {
        namespaced(self.namespace.as_deref(), key)
    }

    fn storage_key(&self, key: &str, tags: Option<&TagSet>) -> String {
        self.key(&resolve_key(key, tags))
    }

    async fn write(
        &self,
        entries: &[(&str, String)],
        ttl: Option<Duration>,
        tags: Option<&TagSet>,
    ) -> CacheResult<()> {
        let mut conn = self.connection()?;
        let pipe = match tags {
            Some(tags) => tagged_write_pipeline(self.namespace.as_deref(), tags, entries, ttl),
            None => {
                let mut pipe = redis::pipe();
                for (key, raw) in entries {
                    push_set(&mut pipe, self.key(key), raw, ttl);
                }
                pipe
            }
        };
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}

/// `MULTI`, `SADD` the reference to every index, write each value,
/// `EXEC`.
fn tagged_write_pipeline(
    namespace: Option<&str>,
    tags: &TagSet,
    entries: &[(&str, String)],
    ttl: Option<Duration>,
) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic();
    for (key, raw) in entries {
        let reference = tags.reference_key(key);
        for index in tags.index_keys() {
            pipe.sadd(namespaced(namespace, index), &reference).ignore();
        }
        push_set(&mut pipe, namespaced(namespace, &reference), raw, ttl);
    }
    pipe
}

/// `MULTI`, `SREM` the reference from every index, `DEL` the value,
/// `EXEC`.
fn tagged_forget_pipeline(namespace: Option<&str>, tags: &TagSet, key: &str) -> Pipeline {
    let reference = tags.reference_key(key);
    let mut pipe = redis::pipe();
    pipe.atomic();
    for index in tags.index_keys() {
        pipe.srem(namespaced(namespace, index), &reference).ignore();
    }
    pipe.del(namespaced(namespace, &reference)).ignore();
    pipe
}

/// `KEYS` and `ARGV[1]` for the flush script: the physical index keys and
/// the prefix put in front of each reference.
fn flush_arguments(namespace: Option<&str>, tags: &TagSet) -> (Vec<String>, String) {
    let keys = tags
        .index_keys()
        .iter()
        .map(|index| namespaced(namespace, index))
        .collect();
    (keys, namespaced(namespace, ""))
}

/// `SET key value [EX seconds]`.
fn push_set(pipe: &mut Pipeline, key: String, raw: &str, ttl: Option<Duration>) {
    match effective_ttl(ttl) {
        Some(ttl) => pipe.set_ex(key, raw, ttl_seconds(ttl)).ignore(),
        None => pipe.set(key, raw).ignore(),
    };
}

#[async_trait]
impl Driver for RedisDriver {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn serializer(&self) -> &dyn Serializer {
        self.serializer.as_ref()
    }

    async fn get(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<Option<Value>> {
        let mut conn = self.connection()?;
        let raw: Option<String> = conn.get(self.storage_key(key, tags)).await?;
        raw.map(|raw| self.deserialize(&raw)).transpose()
    }

    async fn get_many(
        &self,
        keys: &[&str],
        tags: Option<&TagSet>,
    ) -> CacheResult<Vec<Option<Value>>> {
        let mut conn = self.connection()?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let storage_keys: Vec<String> = keys.iter().map(|k| self.storage_key(k, tags)).collect();
        let raws: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&storage_keys)
            .query_async(&mut conn)
            .await?;

        raws.into_iter()
            .map(|raw| raw.map(|raw| self.deserialize(&raw)).transpose())
            .collect()
    }

    async fn put(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
        tags: Option<&TagSet>,
    ) -> CacheResult<()> {
        let raw = self.serialize(value)?;
        self.write(&[(key, raw)], ttl, tags).await
    }

    async fn put_many(
        &self,
        entries: &[(&str, Value)],
        ttl: Option<Duration>,
        tags: Option<&TagSet>,
    ) -> CacheResult<()> {
        let encoded = entries
            .iter()
            .map(|(key, value)| Ok((*key, self.serialize(value)?)))
            .collect::<CacheResult<Vec<_>>>()?;
        if encoded.is_empty() {
            return Ok(());
        }
        self.write(&encoded, ttl, tags).await
    }

    /// Read, add, write back without expiration. Two concurrent callers can
    /// both read the same value and one update is lost.
    async fn increment(&self, key: &str, amount: i64, tags: Option<&TagSet>) -> CacheResult<i64> {
        let current = self.get(key, tags).await?;
        let next = apply_delta(key, current.as_ref(), amount)?;
        let raw = self.serialize(&Value::from(next))?;
        self.write(&[(key, raw)], None, tags).await?;
        Ok(next)
    }

    async fn forget(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<()> {
        let mut conn = self.connection()?;
        match tags {
            Some(tags) => {
                let _: () = tagged_forget_pipeline(self.namespace.as_deref(), tags, key)
                    .query_async(&mut conn)
                    .await?;
            }
            None => {
                let _: () = conn.del(self.key(key)).await?;
            }
        }
        Ok(())
    }

    async fn flush(&self, tags: Option<&TagSet>) -> CacheResult<()> {
        let mut conn = self.connection()?;
        match tags {
            Some(tags) if tags.is_empty() => {}
            Some(tags) => {
                let (keys, prefix) = flush_arguments(self.namespace.as_deref(), tags);
                let mut invocation = self.flush_script.prepare_invoke();
                invocation.key(keys).arg(prefix);

                let removed: i64 = invocation.invoke_async(&mut conn).await?;
                debug!("Flushed {} references for tags {}", removed, tags);
            }
            None => {
                let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
                debug!("Flushed Redis database");
            }
        }
        Ok(())
    }

    async fn has(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<bool> {
        let mut conn = self.connection()?;
        let exists: bool = conn.exists(self.storage_key(key, tags)).await?;
        Ok(exists)
    }

    async fn dispose(&self) -> CacheResult<()> {
        if self.connection.lock().take().is_some() {
            debug!("Redis cache driver disposed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for RedisDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisDriver")
            .field("namespace", &self.namespace)
            .field("connected", &self.connection.lock().is_some())
            .finish()
    }
}
