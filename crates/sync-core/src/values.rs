//! Value representations for records read from the Salesforce API.
//!
//! This module defines the tagged value type used for every field of a
//! remote record, and the `Record` mapping that the API collaborator hands
//! to the extraction cycle.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use indexmap::IndexMap;

/// Tagged value for a single field of a remote record.
///
/// Records arrive from the API as JSON; `UniversalValue` is the narrow,
/// source-agnostic representation the rest of the sync works with.
/// `DateTime` never comes from the API directly: it is produced by the
/// field projector when a `date`/`datetime` field is coerced.
#[derive(Debug, Clone, PartialEq)]
pub enum UniversalValue {
    /// Null / absent value
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Int64(i64),

    /// 64-bit floating point
    Float64(f64),

    /// String value
    Text(String),

    /// Normalized timestamp
    DateTime(DateTime<Utc>),

    /// Array of values
    Array(Vec<UniversalValue>),

    /// Nested record, e.g. a parent relationship, in the order the API sent it
    Object(IndexMap<String, UniversalValue>),
}

impl UniversalValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a nested object.
    pub fn as_object(&self) -> Option<&IndexMap<String, UniversalValue>> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Try to get this value as a DateTime.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Render a scalar value the way it is persisted as a watermark.
    ///
    /// Returns `None` for null, arrays and objects, which cannot bound an
    /// incremental query.
    pub fn to_watermark_string(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Int64(i) => Some(i.to_string()),
            Self::Float64(f) => Some(f.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::DateTime(dt) => Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Null | Self::Array(_) | Self::Object(_) => None,
        }
    }

    /// Remove the given key from this value and every nested object.
    pub fn strip_key(&mut self, key: &str) {
        match self {
            Self::Object(map) => {
                map.shift_remove(key);
                for nested in map.values_mut() {
                    nested.strip_key(key);
                }
            }
            Self::Array(items) => {
                for item in items {
                    item.strip_key(key);
                }
            }
            _ => {}
        }
    }
}

impl From<serde_json::Value> for UniversalValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int64(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float64(f)
                } else {
                    // Out-of-range u64; keep the digits rather than lose them
                    Self::Text(n.to_string())
                }
            }
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(arr) => {
                Self::Array(arr.into_iter().map(UniversalValue::from).collect())
            }
            serde_json::Value::Object(obj) => Self::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, UniversalValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for UniversalValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for UniversalValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for UniversalValue {
    fn from(i: i64) -> Self {
        Self::Int64(i)
    }
}

impl From<bool> for UniversalValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl Serialize for UniversalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int64(i) => serializer.serialize_i64(*i),
            Self::Float64(f) => serializer.serialize_f64(*f),
            Self::Text(s) => serializer.serialize_str(s),
            Self::DateTime(dt) => {
                serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(obj) => {
                let mut map = serializer.serialize_map(Some(obj.len()))?;
                for (k, v) in obj {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// A single row returned by a query.
///
/// Field lookup is exact first, then ASCII case-insensitive, since SOQL field
/// names are case-insensitive while the API answers with canonical casing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<String, UniversalValue>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a top-level field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<UniversalValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`Record::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<UniversalValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a top-level field.
    pub fn get(&self, key: &str) -> Option<&UniversalValue> {
        lookup(&self.fields, key)
    }

    /// Resolve a dot-separated path through nested relationship records.
    ///
    /// A missing intermediate or leaf, or an intermediate that is not an
    /// object, resolves to `None`.
    pub fn get_path(&self, path: &str) -> Option<&UniversalValue> {
        let mut segments = path.split('.');
        let mut current = lookup(&self.fields, segments.next()?)?;
        for segment in segments {
            match current {
                UniversalValue::Object(map) => current = lookup(map, segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Iterate over the top-level field names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, UniversalValue::from(v)))
                .collect(),
        }
    }
}

fn lookup<'a>(
    map: &'a IndexMap<String, UniversalValue>,
    key: &str,
) -> Option<&'a UniversalValue> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
