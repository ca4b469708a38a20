//! Value codecs used by every driver before touching the store.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Encodes cache values to the string form kept in the backing store.
pub trait Serializer: Send + Sync + fmt::Debug {
    fn serialize(&self, value: &Value) -> CacheResult<String>;

    fn deserialize(&self, raw: &str) -> CacheResult<Value>;
}

/// JSON text codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> CacheResult<String> {
        serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize(&self, raw: &str) -> CacheResult<Value> {
        serde_json::from_str(raw).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}

/// Stores strings verbatim. Only strings are accepted, so every stored
/// text reads back as the same string.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawSerializer;

impl Serializer for RawSerializer {
    fn serialize(&self, value: &Value) -> CacheResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(CacheError::Serialization(format!(
                "raw serializer only stores strings, got {}",
                value_kind(other)
            ))),
        }
    }

    fn deserialize(&self, raw: &str) -> CacheResult<Value> {
        Ok(Value::String(raw.to_string()))
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Serializer selection, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    #[default]
    Json,
    Raw,
}

impl SerializerKind {
    /// Instantiate the codec.
    pub fn build(self) -> Arc<dyn Serializer> {
        match self {
            SerializerKind::Json => Arc::new(JsonSerializer),
            SerializerKind::Raw => Arc::new(RawSerializer),
        }
    }
}

impl FromStr for SerializerKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(SerializerKind::Json),
            "raw" | "plain" => Ok(SerializerKind::Raw),
            other => Err(CacheError::Config(format!("unknown serializer '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip_preserves_structure() {
        let value = json!({"name": "a", "roles": ["admin"], "age": 3});
        let raw = JsonSerializer.serialize(&value).unwrap();
        assert_eq!(JsonSerializer.deserialize(&raw).unwrap(), value);
    }

    #[test]
    fn test_json_rejects_garbage() {
        assert!(matches!(
            JsonSerializer.deserialize("{not json"),
            Err(CacheError::Deserialization(_))
        ));
    }

    #[test]
    fn test_raw_keeps_strings_verbatim() {
        assert_eq!(RawSerializer.serialize(&json!("hello")).unwrap(), "hello");
        assert_eq!(RawSerializer.deserialize("hello").unwrap(), json!("hello"));
    }

    #[test]
    fn test_raw_round_trips_json_looking_strings() {
        for text in ["true", "null", "42", "-1.5", "[1]", "{\"a\":1}", "\"quoted\"", ""] {
            let value = json!(text);
            let raw = RawSerializer.serialize(&value).unwrap();
            assert_eq!(raw, text);
            assert_eq!(RawSerializer.deserialize(&raw).unwrap(), value, "{:?}", text);
        }
    }

    #[test]
    fn test_raw_rejects_non_strings() {
        for value in [json!(42), json!(true), json!(null), json!([1]), json!({"a": 1})] {
            assert!(
                matches!(RawSerializer.serialize(&value), Err(CacheError::Serialization(_))),
                "{:?}",
                value
            );
        }
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("JSON".parse::<SerializerKind>().unwrap(), SerializerKind::Json);
        assert_eq!("plain".parse::<SerializerKind>().unwrap(), SerializerKind::Raw);
        assert!(matches!(
            "msgpack".parse::<SerializerKind>(),
            Err(CacheError::Config(_))
        ));
    }
}
