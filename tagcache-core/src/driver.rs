//! The backend-neutral driver contract.

use crate::error::{CacheError, CacheResult};
use crate::serializer::Serializer;
use crate::tagset::TagSet;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Operations every cache backend implements.
///
/// Every operation optionally takes a [`TagSet`]. When one is given the
/// storage key is the tag set's reference key, and writes keep the tag
/// indexes in sync with the stored values. Values pass through the
/// driver's [`Serializer`] on the way in and out.
///
/// Backend transport errors are returned unchanged; nothing is retried.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Codec applied to every stored value.
    fn serializer(&self) -> &dyn Serializer;

    fn serialize(&self, value: &Value) -> CacheResult<String> {
        self.serializer().serialize(value)
    }

    fn deserialize(&self, raw: &str) -> CacheResult<Value> {
        self.serializer().deserialize(raw)
    }

    /// Fetch a value.
    ///
    /// Returns `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<Option<Value>>;

    /// Fetch several values, in the order of `keys`.
    async fn get_many(
        &self,
        keys: &[&str],
        tags: Option<&TagSet>,
    ) -> CacheResult<Vec<Option<Value>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key, tags).await?);
        }
        Ok(values)
    }

    /// Store a value. A `None` or zero `ttl` never expires.
    ///
    /// With tags, every tag index gains the reference key before the value
    /// is written.
    async fn put(
        &self,
        key: &str,
        value: &Value,
        ttl: Option<Duration>,
        tags: Option<&TagSet>,
    ) -> CacheResult<()>;

    /// Store several values with one shared `ttl`.
    async fn put_many(
        &self,
        entries: &[(&str, Value)],
        ttl: Option<Duration>,
        tags: Option<&TagSet>,
    ) -> CacheResult<()> {
        for (key, value) in entries {
            self.put(key, value, ttl, tags).await?;
        }
        Ok(())
    }

    /// Add `amount` to the stored integer and return the new value.
    ///
    /// An absent key counts as zero. A stored value that is not an integer
    /// fails with [`CacheError::InvalidOperand`].
    async fn increment(&self, key: &str, amount: i64, tags: Option<&TagSet>) -> CacheResult<i64>;

    /// Subtract `amount` from the stored integer and return the new value.
    async fn decrement(&self, key: &str, amount: i64, tags: Option<&TagSet>) -> CacheResult<i64> {
        let negated = amount
            .checked_neg()
            .ok_or_else(|| CacheError::invalid_operand(key, "decrement amount overflows"))?;
        self.increment(key, negated, tags).await
    }

    /// Store a value that never expires.
    async fn forever(&self, key: &str, value: &Value, tags: Option<&TagSet>) -> CacheResult<()> {
        self.put(key, value, None, tags).await
    }

    /// Remove a value, and with tags its reference from every tag index.
    async fn forget(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<()>;

    /// With tags, remove every value indexed under any of the tags plus the
    /// indexes. Without tags, wipe the whole store.
    async fn flush(&self, tags: Option<&TagSet>) -> CacheResult<()>;

    /// Whether a value is currently stored.
    async fn has(&self, key: &str, tags: Option<&TagSet>) -> CacheResult<bool>;

    /// Release connections and timers. Later calls fail with
    /// [`CacheError::Disposed`].
    async fn dispose(&self) -> CacheResult<()>;
}

/// `None` when the entry must never expire.
pub(crate) fn effective_ttl(ttl: Option<Duration>) -> Option<Duration> {
    ttl.filter(|ttl| !ttl.is_zero())
}

/// Whole seconds for backends with second granularity, rounded up so a
/// sub-second TTL still expires instead of living forever.
pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 { secs + 1 } else { secs }
}

/// Compute `current + amount` for increment/decrement.
///
/// Absent and `null` count as zero; integer numbers and strings holding an
/// integer are accepted.
pub(crate) fn apply_delta(key: &str, current: Option<&Value>, amount: i64) -> CacheResult<i64> {
    let base = match current {
        None | Some(Value::Null) => 0,
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| CacheError::invalid_operand(key, format!("{} is not an integer", n)))?,
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| {
            CacheError::invalid_operand(key, format!("string '{}' is not numeric", s))
        })?,
        Some(other) => {
            return Err(CacheError::invalid_operand(
                key,
                format!("{} is not numeric", json_kind(other)),
            ));
        }
    };

    base.checked_add(amount)
        .ok_or_else(|| CacheError::invalid_operand(key, "result overflows i64"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Prefix a storage key with the driver namespace, if any.
pub(crate) fn namespaced(namespace: Option<&str>, key: &str) -> String {
    match namespace {
        Some(prefix) => format!("{}:{}", prefix, key),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_effective_ttl() {
        assert_eq!(effective_ttl(None), None);
        assert_eq!(effective_ttl(Some(Duration::ZERO)), None);
        assert_eq!(
            effective_ttl(Some(Duration::from_secs(5))),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_ttl_seconds_rounds_up() {
        assert_eq!(ttl_seconds(Duration::from_secs(60)), 60);
        assert_eq!(ttl_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_seconds(Duration::from_millis(1)), 1);
    }

    #[test]
    fn test_apply_delta_absent_counts_as_zero() {
        assert_eq!(apply_delta("k", None, 5).unwrap(), 5);
        assert_eq!(apply_delta("k", Some(&Value::Null), -2).unwrap(), -2);
    }

    #[test]
    fn test_apply_delta_numeric_values() {
        assert_eq!(apply_delta("k", Some(&json!(10)), 5).unwrap(), 15);
        assert_eq!(apply_delta("k", Some(&json!(" 7 ")), 1).unwrap(), 8);
    }

    #[test]
    fn test_apply_delta_rejects_non_numeric() {
        for bad in [json!("abc"), json!({"a": 1}), json!([1]), json!(true), json!(1.5)] {
            let err = apply_delta("k", Some(&bad), 1).unwrap_err();
            assert!(matches!(err, CacheError::InvalidOperand { .. }), "{:?}", bad);
        }
    }

    #[test]
    fn test_apply_delta_overflow() {
        assert!(matches!(
            apply_delta("k", Some(&json!(i64::MAX)), 1),
            Err(CacheError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn test_namespaced() {
        assert_eq!(namespaced(None, "k"), "k");
        assert_eq!(namespaced(Some("app"), "tags:users"), "app:tags:users");
    }
}
