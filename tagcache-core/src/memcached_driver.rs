//! Memcached cache driver.
//!
//! Memcached only offers scalar get/set/delete, so each tag index is a JSON
//! array of references stored under the index key and updated with a
//! read-modify-write. Nothing serializes those updates: two writers tagging
//! different keys at the same moment can both read the old array, and the
//! last write wins, dropping the other reference from the index.

use crate::config::CacheConfig;
use crate::driver::{Driver, apply_delta, effective_ttl, namespaced, ttl_seconds};
use crate::error::{CacheError, CacheResult};
use crate::serializer::Serializer;
use crate::tagset::{TagSet, resolve_key};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tagcache_log::debug;

/// Longest expiration memcached reads as relative seconds. Anything larger
/// is taken as an absolute unix timestamp.
pub const MAX_RELATIVE_EXPIRATION: u64 = 60 * 60 * 24 * 30;

/// The scalar commands the driver needs from a memcached connection.
#[async_trait]
pub trait MemcacheConnection: Send + Sync {
    /// Fetch the keys that exist; missing keys are absent from the map.
    async fn get_multi(&self, keys: &[String]) -> CacheResult<HashMap<String, String>>;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// `expiration` is in memcached form: 0, relative seconds, or a unix
    /// timestamp.
    async fn set(&self, key: &str, value: &str, expiration: u32) -> CacheResult<()>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// `flush_all`: drops every key on the server.
    async fn flush(&self) -> CacheResult<()>;

    async fn close(&self);
}

/// Driver backed by a [`MemcacheConnection`].
pub struct MemcachedDriver {
    connection: Arc<dyn MemcacheConnection>,
    serializer: Arc<dyn Serializer>,
    namespace: Option<String>,
    disposed: AtomicBool,
}

impl MemcachedDriver {
    /// Connect to the server named by `config.url`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tagcache_core::*;
    ///
    /// # async fn example() -> CacheResult<()> {
    /// let driver = MemcachedDriver::connect(&CacheConfig::memcached("localhost:11211")).await?;
    /// driver.flush(Some(&TagSet::new(["users"]))).await?;
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "memcached")]
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        let client = MemcacheClient::connect(&config.url).await?;
        tagcache_log::info!("Memcached cache driver connected to {}", config.url);
        Ok(Self::with_connection(Arc::new(client), config))
    }

    /// Use an existing connection.
    pub fn with_connection(connection: Arc<dyn MemcacheConnection>, config: &CacheConfig) -> Self {
        Self {
            connection,
            serializer: config.serializer.build(),
            namespace: config.namespace.clone(),
            disposed: AtomicBool::new(false),
        }
    }

    fn key(&self, key: &str) -> String {
        namespaced(self.namespace.as_deref(), key)
    }

    fn storage_key(&self, key: &str, tags: Option<&TagSet>) -> String {
        self.key(&resolve_key(key, tags))
    }

    fn index_keys(&self, tags: &TagSet) -> Vec<String> {
        tags.index_keys().iter().map(|index| self.key(index)).collect()
    }

    fn ensure_active(&self) -> CacheResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(CacheError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Current reference arrays for `index_keys`; missing indexes are absent.
    async fn read_indexes(&self, index_keys: &[String]) -> CacheResult<HashMap<String, Vec<String>>> {
        let raw = self.connection.get_multi(index_keys).await?;
        raw.into_iter()
            .map(|(key, raw)| {
                let references = serde_json::from_str(&raw).map_err(|e| {
                    CacheError::Deserialization(format!("tag index '{}': {}", key, e))
                })?;
                Ok((key, references))
            })
            .collect()
    }

    async fn write_index(&self, index_key: &str, references: &[String]) -> CacheResult<()> {
        if references.is_empty() {
            self.connection.delete(index_key).await?;
        } else {
            let raw = serde_json::to_string(references)
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            self.connection.set(index_key, &raw, 0).await?;
        }
        Ok(())
    }

    async fn write(
        &self,
        entries: &[(&str, String)],
        ttl: Option<Duration>,
        tags: Option<&TagSet>,
    ) -> CacheResult<()> {
        if let Some(tags) = tags {
            let index_keys = self.index_keys(tags);
            let mut indexes = self.read_indexes(&index_keys).await?;
            let mut written = HashSet::new();

            for index_key in &index_keys {
                let references = indexes.entry(index_key.clone()).or_default();
                for (key, _) in entries {
                    let reference = tags.reference_key(key);
                    if !references.contains(&reference) {
                        references.push(reference);
                    }
                }
                if written.insert(index_key.as_str()) {
                    self.write_index(index_key, references).await?;
                }
            }
        }

        let exp = expiration(ttl);
        for (key, raw) in entries {
            self.connection
                .set(&self.storage_key(key, tags), raw, exp)
                .await?;
        }
        Ok(())
    }
}

/// Memcached expiration for `ttl`, measured from `now` (unix seconds).
fn expiration_from(ttl: Option<Duration>, now: u64) -> u32 {
    let Some(ttl) = effective_ttl(ttl) else {
        return 0;
    };
    let secs = ttl_seconds(ttl);
    let exp = if secs <= MAX_RELATIVE_EXPIRATION {
        secs
    } else {
        now.saturating_add(secs)
    };
    u32::try_from(exp).unwrap_or(u32::MAX)
}

fn expiration(ttl: Option<Duration>) -> u32 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    expiration_from(ttl, now)
}

#[async_trait]
impl Driver for MemcachedDriver {
    fn name(&self) -> &'static str {
        "memcached"
    }

    fn serializer(&self) -> &dyn Serializer {
        self.serializer.as_ref()
    }

    async fn get(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<Option<Value>> {
        self.ensure_active()?;
        let raw = self.connection.get(&self.storage_key(key, tags)).await?;
        raw.map(|raw| self.deserialize(&raw)).transpose()
    }

    async fn get_many(
        &self,
        keys: &[&str],
        tags: Option<&TagSet>,
    ) -> CacheResult<Vec<Option<Value>>> {
        self.ensure_active()?;
        let storage_keys: Vec<String> = keys.iter().map(|k| self.storage_key(k, tags)).collect();
        let mut found = self.connection.get_multi(&storage_keys).await?;

        storage_keys
            .iter()
            .map(|key| {
                found
                    .remove(key)
                    .map(|raw| self.deserialize(&raw))
                    .transpose()
            })
            .collect()
    }

    async fn put(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
        tags: Option<&TagSet>,
    ) -> CacheResult<()> {
        self.ensure_active()?;
        let raw = self.serialize(value)?;
        self.write(&[(key, raw)], ttl, tags).await
    }

    async fn put_many(
        &self,
        entries: &[(&str, Value)],
        ttl: Option<Duration>,
        tags: Option<&TagSet>,
    ) -> CacheResult<()> {
        self.ensure_active()?;
        let encoded = entries
            .iter()
            .map(|(key, value)| Ok((*key, self.serialize(value)?)))
            .collect::<CacheResult<Vec<_>>>()?;
        if encoded.is_empty() {
            return Ok(());
        }
        self.write(&encoded, ttl, tags).await
    }

    /// Read, add, write back without expiration. Not atomic.
    async fn increment(&self, key: &str, amount: i64, tags: Option<&TagSet>) -> CacheResult<i64> {
        let current = self.get(key, tags).await?;
        let next = apply_delta(key, current.as_ref(), amount)?;
        let raw = self.serialize(&Value::from(next))?;
        self.write(&[(key, raw)], None, tags).await?;
        Ok(next)
    }

    async fn forget(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<()> {
        self.ensure_active()?;

        if let Some(tags) = tags {
            let reference = tags.reference_key(key);
            let index_keys = self.index_keys(tags);
            let mut indexes = self.read_indexes(&index_keys).await?;

            for index_key in &index_keys {
                let Some(mut references) = indexes.remove(index_key) else {
                    continue;
                };
                references.retain(|r| *r != reference);
                // An emptied index is deleted rather than stored as `[]`.
                self.write_index(index_key, &references).await?;
            }
        }

        self.connection.delete(&self.storage_key(key, tags)).await?;
        Ok(())
    }

    async fn flush(&self, tags: Option<&TagSet>) -> CacheResult<()> {
        self.ensure_active()?;

        let Some(tags) = tags else {
            self.connection.flush().await?;
            debug!("Flushed all memcached keys");
            return Ok(());
        };
        if tags.is_empty() {
            return Ok(());
        }

        let index_keys = self.index_keys(tags);
        let indexes = self.read_indexes(&index_keys).await?;
        let references: HashSet<&String> = indexes.values().flatten().collect();

        for reference in &references {
            self.connection.delete(&self.key(reference)).await?;
        }
        for index_key in &index_keys {
            self.connection.delete(index_key).await?;
        }
        debug!("Flushed {} references for tags {}", references.len(), tags);
        Ok(())
    }

    async fn has(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<bool> {
        self.ensure_active()?;
        Ok(self
            .connection
            .get(&self.storage_key(key, tags))
            .await?
            .is_some())
    }

    async fn dispose(&self) -> CacheResult<()> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.connection.close().await;
        debug!("Memcached cache driver disposed");
        Ok(())
    }
}

impl std::fmt::Debug for MemcachedDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcachedDriver")
            .field("namespace", &self.namespace)
            .field("disposed", &self.disposed.load(Ordering::Relaxed))
            .finish()
    }
}

/// [`MemcacheConnection`] over the blocking `memcache` client.
///
/// The client has no async API, so every call runs on the blocking pool
/// behind a tokio mutex.
#[cfg(feature = "memcached")]
#[derive(Clone)]
pub struct MemcacheClient {
    client: Arc<tokio::sync::Mutex<Option<memcache::Client>>>,
}

#[cfg(feature = "memcached")]
impl MemcacheClient {
    /// Connect to `memcache://host:port` or plain `host:port`.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let server_url = parse_memcached_url(url)?;

        let client = tokio::task::spawn_blocking(move || memcache::connect(server_url.as_str()))
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to spawn task: {}", e)))?
            .map_err(|e| CacheError::Connection(format!("Failed to connect: {}", e)))?;

        Ok(Self {
            client: Arc::new(tokio::sync::Mutex::new(Some(client))),
        })
    }

    async fn run<T, F>(&self, op: F) -> CacheResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&memcache::Client) -> Result<T, memcache::MemcacheError> + Send + 'static,
    {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || {
            let guard = client.blocking_lock();
            let client = guard.as_ref().ok_or(CacheError::Disposed)?;
            op(client).map_err(CacheError::from)
        })
        .await
        .map_err(|e| CacheError::Other(format!("Task join error: {}", e)))?
    }
}

#[cfg(feature = "memcached")]
#[async_trait]
impl MemcacheConnection for MemcacheClient {
    async fn get_multi(&self, keys: &[String]) -> CacheResult<HashMap<String, String>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let keys = keys.to_vec();
        self.run(move |client| {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            client.gets::<String>(&keys)
        })
        .await
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let key = key.to_string();
        self.run(move |client| client.get::<String>(&key)).await
    }

    async fn set(&self, key: &str, value: &str, expiration: u32) -> CacheResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.run(move |client| client.set(&key, value.as_str(), expiration))
            .await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let key = key.to_string();
        self.run(move |client| client.delete(&key)).await
    }

    async fn flush(&self) -> CacheResult<()> {
        self.run(|client| client.flush()).await
    }

    async fn close(&self) {
        self.client.lock().await.take();
    }
}

/// Normalize a server URL to `memcache://host:port`.
pub fn parse_memcached_url(url: &str) -> CacheResult<String> {
    if url.starts_with("memcache://") || url.starts_with("memcache+tls://") {
        Ok(url.to_string())
    } else if !url.contains("://") && url.contains(':') {
        Ok(format!("memcache://{}", url))
    } else {
        Err(CacheError::InvalidUrl(format!(
            "Invalid Memcached URL: {}. Expected format: 'memcache://host:port' or 'host:port'",
            url
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Barrier;

    /// In-process stand-in for a memcached server.
    #[derive(Default)]
    struct FakeMemcache {
        store: parking_lot::Mutex<HashMap<String, String>>,
        expirations: parking_lot::Mutex<HashMap<String, u32>>,
        closed: AtomicBool,
        /// Holds the first two `get_multi` callers until both have read.
        gate: Option<Barrier>,
        gate_uses: AtomicUsize,
    }

    impl FakeMemcache {
        fn gated() -> Self {
            Self {
                gate: Some(Barrier::new(2)),
                ..Self::default()
            }
        }

        fn raw(&self, key: &str) -> Option<String> {
            self.store.lock().get(key).cloned()
        }

        fn index(&self, key: &str) -> Option<Vec<String>> {
            self.raw(key).map(|raw| serde_json::from_str(&raw).unwrap())
        }
    }

    #[async_trait]
    impl MemcacheConnection for FakeMemcache {
        async fn get_multi(&self, keys: &[String]) -> CacheResult<HashMap<String, String>> {
            let snapshot: HashMap<String, String> = {
                let store = self.store.lock();
                keys.iter()
                    .filter_map(|k| store.get(k).map(|v| (k.clone(), v.clone())))
                    .collect()
            };
            if let Some(gate) = &self.gate
                && self.gate_uses.fetch_add(1, Ordering::SeqCst) < 2
            {
                gate.wait().await;
            }
            Ok(snapshot)
        }

        async fn get(&self, key: &str) -> CacheResult<Option<String>> {
            Ok(self.raw(key))
        }

        async fn set(&self, key: &str, value: &str, expiration: u32) -> CacheResult<()> {
            self.store.lock().insert(key.to_string(), value.to_string());
            self.expirations.lock().insert(key.to_string(), expiration);
            Ok(())
        }

        async fn delete(&self, key: &str) -> CacheResult<bool> {
            Ok(self.store.lock().remove(key).is_some())
        }

        async fn flush(&self) -> CacheResult<()> {
            self.store.lock().clear();
            Ok(())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn driver_with(fake: &Arc<FakeMemcache>, config: &CacheConfig) -> MemcachedDriver {
        MemcachedDriver::with_connection(fake.clone(), config)
    }

    fn setup() -> (Arc<FakeMemcache>, MemcachedDriver) {
        let fake = Arc::new(FakeMemcache::default());
        let driver = driver_with(&fake, &CacheConfig::memcached("localhost:11211"));
        (fake, driver)
    }

    #[test]
    fn test_parse_memcached_url() {
        assert_eq!(
            parse_memcached_url("memcache://localhost:11211").unwrap(),
            "memcache://localhost:11211"
        );
        assert_eq!(
            parse_memcached_url("localhost:11211").unwrap(),
            "memcache://localhost:11211"
        );
        assert!(parse_memcached_url("invalid").is_err());
        assert!(parse_memcached_url("redis://localhost:6379").is_err());
    }

    #[test]
    fn test_expiration_conversion() {
        let now = 1_700_000_000;
        assert_eq!(expiration_from(None, now), 0);
        assert_eq!(expiration_from(Some(Duration::ZERO), now), 0);
        assert_eq!(expiration_from(Some(Duration::from_secs(60)), now), 60);
        assert_eq!(expiration_from(Some(Duration::from_millis(200)), now), 1);
        assert_eq!(
            expiration_from(Some(Duration::from_secs(MAX_RELATIVE_EXPIRATION)), now),
            MAX_RELATIVE_EXPIRATION as u32
        );
        assert_eq!(
            expiration_from(Some(Duration::from_secs(MAX_RELATIVE_EXPIRATION + 1)), now),
            (now + MAX_RELATIVE_EXPIRATION + 1) as u32
        );
    }

    #[tokio::test]
    async fn test_tagged_put_writes_index_and_value() {
        let (fake, driver) = setup();
        let tags = TagSet::new(["users", "admins"]);
        driver
            .put("user:1", &json!({"id": 1}), Some(Duration::from_secs(30)), Some(&tags))
            .await
            .unwrap();
        driver.put("user:2", &json!({"id": 2}), None, Some(&tags)).await.unwrap();

        let expected = vec![tags.reference_key("user:1"), tags.reference_key("user:2")];
        assert_eq!(fake.index("tags:users"), Some(expected.clone()));
        assert_eq!(fake.index("tags:admins"), Some(expected));
        assert_eq!(fake.expirations.lock()[&tags.reference_key("user:1")], 30);
        assert_eq!(fake.expirations.lock()["tags:users"], 0);

        assert_eq!(
            driver.get("user:1", Some(&tags)).await.unwrap(),
            Some(json!({"id": 1}))
        );
        assert_eq!(driver.get("user:1", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_repeated_put_keeps_single_reference() {
        let (fake, driver) = setup();
        let tags = TagSet::new(["users"]);
        for n in 0..3 {
            driver.put("user:1", &json!(n), None, Some(&tags)).await.unwrap();
        }
        assert_eq!(fake.index("tags:users").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tagged_forget_prunes_empty_index() {
        let (fake, driver) = setup();
        let tags = TagSet::new(["users"]);
        driver.put("a", &json!(1), None, Some(&tags)).await.unwrap();
        driver.put("b", &json!(2), None, Some(&tags)).await.unwrap();

        driver.forget("a", Some(&tags)).await.unwrap();
        assert_eq!(fake.index("tags:users"), Some(vec![tags.reference_key("b")]));

        driver.forget("b", Some(&tags)).await.unwrap();
        assert_eq!(fake.raw("tags:users"), None);
        assert!(!driver.has("b", Some(&tags)).await.unwrap());
    }

    #[tokio::test]
    async fn test_tagged_flush_removes_references_and_indexes() {
        let (fake, driver) = setup();
        let a = TagSet::new(["a"]);
        let ab = TagSet::new(["a", "b"]);
        driver.put("k1", &json!(1), None, Some(&a)).await.unwrap();
        driver.put("k2", &json!(2), None, Some(&ab)).await.unwrap();
        driver.put("plain", &json!(3), None, None).await.unwrap();

        driver.flush(Some(&TagSet::new(["b"]))).await.unwrap();
        assert_eq!(driver.get("k2", Some(&ab)).await.unwrap(), None);
        assert_eq!(driver.get("k1", Some(&a)).await.unwrap(), Some(json!(1)));
        assert_eq!(fake.raw("tags:b"), None);
        // The surviving index still names the flushed reference.
        assert_eq!(fake.index("tags:a").unwrap().len(), 2);

        driver.flush(Some(&a)).await.unwrap();
        assert_eq!(driver.get("k1", Some(&a)).await.unwrap(), None);
        assert_eq!(driver.get("plain", None).await.unwrap(), Some(json!(3)));
    }

    #[tokio::test]
    async fn test_untagged_flush_clears_server() {
        let (fake, driver) = setup();
        driver.put("k", &json!(1), None, Some(&TagSet::new(["t"]))).await.unwrap();
        driver.flush(None).await.unwrap();
        assert!(fake.store.lock().is_empty());
    }

    #[tokio::test]
    async fn test_namespace_applies_to_physical_keys_only() {
        let fake = Arc::new(FakeMemcache::default());
        let driver = driver_with(
            &fake,
            &CacheConfig::memcached("localhost:11211").with_namespace("app"),
        );
        let tags = TagSet::new(["users"]);
        driver.put("k", &json!(1), None, Some(&tags)).await.unwrap();

        assert_eq!(fake.index("app:tags:users"), Some(vec![tags.reference_key("k")]));
        assert!(fake.raw(&format!("app:{}", tags.reference_key("k"))).is_some());

        driver.flush(Some(&tags)).await.unwrap();
        assert!(fake.store.lock().is_empty());
    }

    #[tokio::test]
    async fn test_increment_and_get_many() {
        let (fake, driver) = setup();
        assert_eq!(driver.increment("n", 3, None).await.unwrap(), 3);
        assert_eq!(driver.decrement("n", 5, None).await.unwrap(), -2);
        assert_eq!(fake.expirations.lock()["n"], 0);

        driver.put("s", &json!("x"), None, None).await.unwrap();
        assert!(matches!(
            driver.increment("s", 1, None).await,
            Err(CacheError::InvalidOperand { .. })
        ));

        let values = driver.get_many(&["s", "missing", "n"], None).await.unwrap();
        assert_eq!(values, vec![Some(json!("x")), None, Some(json!(-2))]);
    }

    #[tokio::test]
    async fn test_corrupt_index_is_deserialization_error() {
        let (fake, driver) = setup();
        fake.set("tags:users", "not json", 0).await.unwrap();
        let err = driver
            .put("k", &json!(1), None, Some(&TagSet::new(["users"])))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
    }

    #[tokio::test]
    async fn test_concurrent_tagged_puts_lose_a_reference() {
        let fake = Arc::new(FakeMemcache::gated());
        let driver = driver_with(&fake, &CacheConfig::memcached("localhost:11211"));
        let tags = TagSet::new(["users"]);
        let (one, two) = (json!(1), json!(2));

        let (first, second) = tokio::join!(
            driver.put("user:1", &one, None, Some(&tags)),
            driver.put("user:2", &two, None, Some(&tags)),
        );
        first.unwrap();
        second.unwrap();

        // Both values landed but only the last index write survived.
        assert!(driver.has("user:1", Some(&tags)).await.unwrap());
        assert!(driver.has("user:2", Some(&tags)).await.unwrap());
        assert_eq!(fake.index("tags:users").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dispose_closes_connection_once() {
        let (fake, driver) = setup();
        driver.dispose().await.unwrap();
        driver.dispose().await.unwrap();
        assert!(fake.closed.load(Ordering::SeqCst));
        assert!(matches!(driver.has("k", None).await, Err(CacheError::Disposed)));
    }

    #[cfg(feature = "memcached")]
    #[tokio::test]
    #[ignore]
    async fn test_live_round_trip() {
        let url = std::env::var("MEMCACHED_URL").unwrap_or_else(|_| "localhost:11211".into());
        let config = CacheConfig::memcached(url).with_namespace("tagcache-test");
        let driver = MemcachedDriver::connect(&config).await.unwrap();
        let tags = TagSet::new(["users"]);

        driver.put("user:1", &json!({"a": 1}), None, Some(&tags)).await.unwrap();
        assert_eq!(
            driver.get("user:1", Some(&tags)).await.unwrap(),
            Some(json!({"a": 1}))
        );
        driver.flush(Some(&tags)).await.unwrap();
        assert!(!driver.has("user:1", Some(&tags)).await.unwrap());
        driver.dispose().await.unwrap();
    }
}
