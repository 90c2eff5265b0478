//! Dynamic values carried by contract instances.
//!
//! Raw input and coerced attribute values share one representation. Arrays
//! and maps are persistent `im` collections, so cloning an instance (or a
//! value inside it) shares structure instead of copying it.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::instance::Contract;

/// Map with canonical string keys.
pub type Map = im::OrdMap<String, Value>;

/// Ordered list of values.
pub type Array = im::Vector<Value>;

/// A raw or coerced attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Time(NaiveTime),
    Array(Array),
    Map(Map),
    Contract(Contract),
}

impl Value {
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// True for plain maps. Contract instances are not map-shaped.
    #[must_use]
    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_contract(&self) -> Option<&Contract> {
        match self {
            Self::Contract(contract) => Some(contract),
            _ => None,
        }
    }

    /// Render nested contracts as their canonical maps, at every depth.
    #[must_use]
    pub fn into_canonical(self) -> Self {
        match self {
            Self::Contract(contract) => Self::Map(contract.to_canonical_map()),
            Self::Array(items) => Self::Array(items.into_iter().map(Self::into_canonical).collect()),
            Self::Map(map) => Self::Map(
                map.into_iter()
                    .map(|(key, value)| (key, value.into_canonical()))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Canonicalize every map key at every depth.
    #[must_use]
    pub fn normalize_keys(self) -> Self {
        match self {
            Self::Map(map) => Self::Map(normalize_map(map)),
            Self::Array(items) => Self::Array(items.into_iter().map(Self::normalize_keys).collect()),
            other => other,
        }
    }

    /// Walk a path of map keys and array indices.
    #[must_use]
    pub fn dig<S: AsRef<str>>(&self, path: &[S]) -> Option<&Self> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self);
        };
        let next = match self {
            Self::Map(map) => map.get(canonical_key(head.as_ref())),
            Self::Array(items) => head.as_ref().parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }?;
        next.dig(rest)
    }
}

/// Canonical form of an input key.
#[must_use]
pub fn canonical_key(key: &str) -> &str {
    key.trim()
}

/// Canonicalize the top-level keys of a map, leaving values untouched.
#[must_use]
pub fn canonicalize_top_level(map: Map) -> Map {
    map.into_iter()
        .map(|(key, value)| (canonical_key(&key).to_string(), value))
        .collect()
}

fn normalize_map(map: Map) -> Map {
    map.into_iter()
        .map(|(key, value)| (canonical_key(&key).to_string(), value.normalize_keys()))
        .collect()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(text) => write!(f, "{text}"),
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Time(time) => write!(f, "{}", time.format("%H:%M:%S")),
            Self::Array(_) | Self::Map(_) | Self::Contract(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                write!(f, "{json}")
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Map(map)
    }
}

impl From<Contract> for Value {
    fn from(contract: Contract) -> Self {
        Self::Contract(contract)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Nil,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Nil),
            serde_json::Value::String(text) => Self::Text(text),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(object) => Self::Map(
                object
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Nil => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(n) => serializer.serialize_i64(*n),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Text(text) => serializer.serialize_str(text),
            Self::Date(_) | Self::DateTime(_) | Self::Time(_) => {
                serializer.collect_str(self)
            }
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(map) => serialize_map(map, serializer),
            Self::Contract(contract) => serialize_map(&contract.to_canonical_map(), serializer),
        }
    }
}

fn serialize_map<S: Serializer>(map: &Map, serializer: S) -> Result<S::Ok, S::Error> {
    let mut out = serializer.serialize_map(Some(map.len()))?;
    for (key, value) in map {
        out.serialize_entry(key, value)?;
    }
    out.end()
}

/// Build a [`Map`] from key/value pairs.
///
/// ```rust,ignore
/// let input = dto_core::map! { "name" => "Alice", "age" => 30 };
/// ```
#[macro_export]
macro_rules! map {
    () => { $crate::value::Map::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::value::Map::new();
        $(
            map.insert(::std::string::String::from($key), $crate::value::Value::from($value));
        )+
        map
    }};
}

// ═══════════════════════════════════════════════════════════════════════════
// UNIT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_object_keeps_shape() {
        let json = serde_json::json!({"a": 1, "b": [true, null], "c": {"d": 1.5}});
        let value = Value::from(json);
        let map = value.as_map().cloned().unwrap_or_default();
        assert_eq!(map.get("a"), Some(&Value::Integer(1)));
        assert_eq!(
            map.get("b"),
            Some(&Value::from(vec![Value::Bool(true), Value::Nil]))
        );
        assert_eq!(value.dig(&["c", "d"]), Some(&Value::Float(1.5)));
    }

    #[test]
    fn test_normalize_keys_reaches_every_depth() {
        let inner = crate::map! { " deep " => 1 };
        let value = Value::Map(crate::map! {
            " outer " => inner,
            "list" => vec![Value::Map(crate::map! { "  x" => 2 })],
        });
        let normalized = value.normalize_keys();
        assert_eq!(normalized.dig(&["outer", "deep"]), Some(&Value::Integer(1)));
        assert_eq!(normalized.dig(&["list", "0", "x"]), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_dig_misses_return_none() {
        let value = Value::Map(crate::map! { "a" => 1 });
        assert!(value.dig(&["a", "b"]).is_none());
        assert!(value.dig(&["missing"]).is_none());
    }

    #[test]
    fn test_temporal_values_serialize_as_iso_text() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).map(Value::Date).unwrap_or_default();
        let json = serde_json::to_value(&date).unwrap_or_default();
        assert_eq!(json, serde_json::json!("2024-02-29"));
    }

    #[test]
    fn test_map_macro_converts_values() {
        let map = crate::map! { "name" => "Alice", "age" => 30, "nick" => None::<String> };
        assert_eq!(map.get("name"), Some(&Value::Text("Alice".to_string())));
        assert_eq!(map.get("age"), Some(&Value::Integer(30)));
        assert_eq!(map.get("nick"), Some(&Value::Nil));
    }
}
