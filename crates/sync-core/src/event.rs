//! Normalized events produced by the field projector.

use crate::values::UniversalValue;
use indexmap::IndexMap;
use serde::Serialize;

/// One projected record, ready for the sink.
///
/// Keys keep the order the projector inserted them in, which is the order of
/// the selected field list. Serializes as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedEvent {
    entries: IndexMap<String, UniversalValue>,
}

impl NormalizedEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, replacing the value in place if the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: UniversalValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&UniversalValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniversalValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
