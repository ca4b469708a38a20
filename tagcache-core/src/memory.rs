//! In-process cache driver.
//!
//! Values live in a map of serialized strings. Time-limited entries are
//! tracked in a roster of remaining sweep ticks; a background task ticks
//! the roster at a fixed period and evicts entries whose count reaches
//! zero. Eviction never touches the tag indexes, so an index may name a
//! reference whose value is already gone.

use crate::config::CacheConfig;
use crate::driver::{Driver, apply_delta, effective_ttl, namespaced};
use crate::error::{CacheError, CacheResult};
use crate::serializer::Serializer;
use crate::tagset::{TagSet, index_key, resolve_key};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tagcache_log::{debug, trace};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

#[derive(Debug, Clone)]
struct RosterEntry {
    key: String,
    remaining_ticks: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    values: HashMap<String, String>,
    tag_index: HashMap<String, Vec<String>>,
    roster: Vec<RosterEntry>,
}

impl MemoryState {
    /// Append `reference` unless the index already holds it.
    fn index_reference(&mut self, index_key: String, reference: &str) {
        let references = self.tag_index.entry(index_key).or_default();
        if !references.iter().any(|r| r == reference) {
            references.push(reference.to_string());
        }
    }

    /// Splice `reference` out of the index. The index key stays even when
    /// it ends up empty.
    fn unindex_reference(&mut self, index_key: &str, reference: &str) {
        if let Some(references) = self.tag_index.get_mut(index_key)
            && let Some(position) = references.iter().position(|r| r == reference)
        {
            references.remove(position);
        }
    }

    /// Replace the roster entry for `key`; `None` makes it permanent.
    fn schedule(&mut self, key: &str, ticks: Option<u64>) {
        self.roster.retain(|entry| entry.key != key);
        if let Some(remaining_ticks) = ticks {
            self.roster.push(RosterEntry {
                key: key.to_string(),
                remaining_ticks,
            });
        }
    }

    fn remove_value(&mut self, key: &str) {
        self.values.remove(key);
        self.roster.retain(|entry| entry.key != key);
    }

    /// Advance every roster entry by one tick and evict the ones that hit
    /// zero. Returns the number of evicted values.
    fn tick(&mut self) -> usize {
        let mut expired = Vec::new();
        self.roster.retain_mut(|entry| {
            entry.remaining_ticks = entry.remaining_ticks.saturating_sub(1);
            if entry.remaining_ticks == 0 {
                expired.push(std::mem::take(&mut entry.key));
                false
            } else {
                true
            }
        });

        for key in &expired {
            self.values.remove(key);
        }
        expired.len()
    }
}

/// In-process driver with its own value map, tag indexes and sweep task.
///
/// Every operation holds the state lock from start to finish, so
/// operations never interleave with each other or with a sweep.
pub struct MemoryDriver {
    state: Arc<RwLock<MemoryState>>,
    serializer: Arc<dyn Serializer>,
    namespace: Option<String>,
    sweep_interval: Duration,
    sweeper: parking_lot::Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl MemoryDriver {
    /// Create the driver and start its sweep task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tagcache_core::*;
    /// use serde_json::json;
    ///
    /// # async fn example() -> CacheResult<()> {
    /// let driver = MemoryDriver::new(&CacheConfig::memory())?;
    /// let tags = TagSet::new(["users"]);
    /// driver.put("user:1", &json!({"name": "a"}), None, Some(&tags)).await?;
    /// driver.flush(Some(&tags)).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: &CacheConfig) -> CacheResult<Self> {
        if config.sweep_interval.is_zero() {
            return Err(CacheError::Config(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        tokio::runtime::Handle::try_current().map_err(|_| {
            CacheError::Config("memory driver requires a running tokio runtime".to_string())
        })?;

        let state = Arc::new(RwLock::new(MemoryState::default()));
        let sweeper = spawn_sweeper(Arc::downgrade(&state), config.sweep_interval);
        debug!(
            "Memory driver started with sweep interval {:?}",
            config.sweep_interval
        );

        Ok(Self {
            state,
            serializer: config.serializer.build(),
            namespace: config.namespace.clone(),
            sweep_interval: config.sweep_interval,
            sweeper: parking_lot::Mutex::new(Some(sweeper)),
            disposed: AtomicBool::new(false),
        })
    }

    /// Run one sweep tick now. Returns the number of evicted values.
    pub async fn sweep(&self) -> usize {
        self.state.write().await.tick()
    }

    /// Sweep period.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// References currently recorded under `tag`, or `None` when the index
    /// key does not exist.
    pub async fn indexed_references(&self, tag: &str) -> Option<Vec<String>> {
        let state = self.state.read().await;
        state.tag_index.get(&self.key(&index_key(tag))).cloned()
    }

    /// Number of stored values. Entries leave on the tick that expires them.
    pub async fn len(&self) -> usize {
        self.state.read().await.values.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn key(&self, key: &str) -> String {
        namespaced(self.namespace.as_deref(), key)
    }

    fn storage_key(&self, key: &str, tags: Option<&TagSet>) -> String {
        self.key(&resolve_key(key, tags))
    }

    fn ticks_for(&self, ttl: Option<Duration>) -> Option<u64> {
        effective_ttl(ttl).map(|ttl| {
            let period = self.sweep_interval.as_nanos();
            let ticks = ttl.as_nanos().div_ceil(period);
            u64::try_from(ticks).unwrap_or(u64::MAX).max(1)
        })
    }

    fn ensure_active(&self) -> CacheResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(CacheError::Disposed)
        } else {
            Ok(())
        }
    }

    fn index_all(&self, state: &mut MemoryState, key: &str, tags: Option<&TagSet>) {
        if let Some(tags) = tags {
            let reference = tags.reference_key(key);
            for index in tags.index_keys() {
                state.index_reference(self.key(index), &reference);
            }
        }
    }

    fn write_locked(
        &self,
        state: &mut MemoryState,
        key: &str,
        raw: String,
        ttl: Option<Duration>,
        tags: Option<&TagSet>,
    ) {
        self.index_all(state, key, tags);
        let storage_key = self.storage_key(key, tags);
        state.schedule(&storage_key, self.ticks_for(ttl));
        state.values.insert(storage_key, raw);
    }
}

fn spawn_sweeper(state: Weak<RwLock<MemoryState>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            ticker.tick().await;
            let Some(shared) = state.upgrade() else {
                break;
            };
            let evicted = shared.write().await.tick();
            if evicted > 0 {
                trace!("Sweep evicted {} expired entries", evicted);
            }
        }
    })
}

#[async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn serializer(&self) -> &dyn Serializer {
        self.serializer.as_ref()
    }

    async fn get(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<Option<Value>> {
        self.ensure_active()?;
        let storage_key = self.storage_key(key, tags);
        let state = self.state.read().await;
        state
            .values
            .get(&storage_key)
            .map(|raw| self.deserialize(raw))
            .transpose()
    }

    async fn get_many(
        &self,
        keys: &[&str],
        tags: Option<&TagSet>,
    ) -> CacheResult<Vec<Option<Value>>> {
        self.ensure_active()?;
        let state = self.state.read().await;
        keys.iter()
            .map(|key| {
                state
                    .values
                    .get(&self.storage_key(key, tags))
                    .map(|raw| self.deserialize(raw))
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
        let mut state = self.state.write().await;
        self.write_locked(&mut state, key, raw, ttl, tags);
        Ok(())
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

        let mut state = self.state.write().await;
        for (key, raw) in encoded {
            self.write_locked(&mut state, key, raw, ttl, tags);
        }
        Ok(())
    }

    async fn increment(&self, key: &str, amount: i64, tags: Option<&TagSet>) -> CacheResult<i64> {
        self.ensure_active()?;
        let storage_key = self.storage_key(key, tags);
        let mut state = self.state.write().await;

        let current = state
            .values
            .get(&storage_key)
            .map(|raw| self.deserialize(raw))
            .transpose()?;
        let next = apply_delta(key, current.as_ref(), amount)?;
        let raw = self.serialize(&Value::from(next))?;

        // The roster is left alone so an existing countdown keeps running.
        self.index_all(&mut state, key, tags);
        state.values.insert(storage_key, raw);
        Ok(next)
    }

    async fn forget(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<()> {
        self.ensure_active()?;
        let mut state = self.state.write().await;

        if let Some(tags) = tags {
            let reference = tags.reference_key(key);
            for index in tags.index_keys() {
                state.unindex_reference(&self.key(index), &reference);
            }
        }
        state.remove_value(&self.storage_key(key, tags));
        Ok(())
    }

    async fn flush(&self, tags: Option<&TagSet>) -> CacheResult<()> {
        self.ensure_active()?;
        let mut state = self.state.write().await;

        match tags {
            Some(tags) => {
                for index in tags.index_keys() {
                    let Some(references) = state.tag_index.remove(&self.key(index)) else {
                        continue;
                    };
                    for reference in references {
                        state.remove_value(&self.key(&reference));
                    }
                }
                debug!("Flushed memory cache tags {}", tags);
            }
            None => {
                *state = MemoryState::default();
                debug!("Flushed entire memory cache");
            }
        }
        Ok(())
    }

    async fn has(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<bool> {
        self.ensure_active()?;
        let storage_key = self.storage_key(key, tags);
        Ok(self.state.read().await.values.contains_key(&storage_key))
    }

    async fn dispose(&self) -> CacheResult<()> {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        *self.state.write().await = MemoryState::default();
        debug!("Memory driver disposed");
        Ok(())
    }
}

impl Drop for MemoryDriver {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDriver")
            .field("namespace", &self.namespace)
            .field("sweep_interval", &self.sweep_interval)
            .field("disposed", &self.disposed.load(Ordering::Relaxed))
            .finish()
    }
}
