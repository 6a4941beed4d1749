//! Field type metadata for Salesforce objects.
//!
//! This module defines `FieldType`, the type tag reported by the describe
//! call for every field of an object, and `FieldTypeMap`, the ordered mapping
//! the extraction cycle builds once at startup.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Declared type of a Salesforce field.
///
/// Only `Date` and `DateTime` change how a value is projected; every other
/// tag is carried for display and passed through unchanged. Unknown tags are
/// preserved in `Other` rather than rejected, since Salesforce adds new field
/// types across API versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Free-form text
    String,

    /// Record identifier (15 or 18 characters)
    Id,

    /// Boolean checkbox
    Boolean,

    /// Integer number
    Int,

    /// Double precision number
    Double,

    /// Currency amount
    Currency,

    /// Percentage
    Percent,

    /// Calendar date without time (`YYYY-MM-DD`)
    Date,

    /// Timestamp with offset
    DateTime,

    /// Time of day
    Time,

    /// Single-select picklist
    Picklist,

    /// Multi-select picklist (semicolon separated)
    MultiPicklist,

    /// Lookup or master-detail reference to another record
    Reference,

    /// Long or rich text area
    Textarea,

    /// Email address
    Email,

    /// Phone number
    Phone,

    /// URL
    Url,

    /// Any other type tag reported by the API
    Other(String),
}

impl FieldType {
    /// Parse a type tag as reported by the describe endpoint.
    pub fn parse(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "id" => Self::Id,
            "boolean" => Self::Boolean,
            "int" => Self::Int,
            "double" => Self::Double,
            "currency" => Self::Currency,
            "percent" => Self::Percent,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "time" => Self::Time,
            "picklist" => Self::Picklist,
            "multipicklist" => Self::MultiPicklist,
            "reference" => Self::Reference,
            "textarea" => Self::Textarea,
            "email" => Self::Email,
            "phone" => Self::Phone,
            "url" => Self::Url,
            _ => Self::Other(tag.to_string()),
        }
    }

    /// The type tag as the describe endpoint spells it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Id => "id",
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Double => "double",
            Self::Currency => "currency",
            Self::Percent => "percent",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Picklist => "picklist",
            Self::MultiPicklist => "multipicklist",
            Self::Reference => "reference",
            Self::Textarea => "textarea",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Url => "url",
            Self::Other(tag) => tag,
        }
    }

    /// Whether values of this type are coerced into timestamps.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::parse(&tag))
    }
}

/// Ordered mapping from field name to declared type.
///
/// Iteration order is the order the describe call returned the fields in.
/// That order is not guaranteed to be stable between runs, so a query built
/// from the full map may list its columns differently from one run to the
/// next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTypeMap {
    entries: IndexMap<String, FieldType>,
}

impl FieldTypeMap {
    /// Create an empty map, as used for raw queries with no describe metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing the type of an existing entry in place.
    pub fn insert(&mut self, name: impl Into<String>, field_type: FieldType) {
        self.entries.insert(name.into(), field_type);
    }

    /// Look up a field's type; falls back to ASCII case-insensitive matching.
    pub fn get(&self, name: &str) -> Option<&FieldType> {
        self.entries.get(name).or_else(|| {
            self.entries
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, t)| t)
        })
    }

    /// Field names in describe order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(name, type)` pairs in describe order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldType)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, FieldType)> for FieldTypeMap {
    fn from_iter<I: IntoIterator<Item = (N, FieldType)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, field_type) in iter {
            map.insert(name, field_type);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_and_unknown_tags() {
        assert_eq!(FieldType::parse("datetime"), FieldType::DateTime);
        assert_eq!(FieldType::parse("DateTime"), FieldType::DateTime);
        assert_eq!(FieldType::parse("reference"), FieldType::Reference);
        assert_eq!(
            FieldType::parse("encryptedstring"),
            FieldType::Other("encryptedstring".to_string())
        );
        assert_eq!(FieldType::parse("encryptedstring").as_str(), "encryptedstring");
    }

    #[test]
    fn test_only_date_types_are_temporal() {
        assert!(FieldType::Date.is_temporal());
        assert!(FieldType::DateTime.is_temporal());
        assert!(!FieldType::Time.is_temporal());
        assert!(!FieldType::String.is_temporal());
    }

    #[test]
    fn test_map_preserves_describe_order() {
        let map: FieldTypeMap = vec![
            ("Id", FieldType::Id),
            ("Name", FieldType::String),
            ("CreatedDate", FieldType::DateTime),
        ]
        .into_iter()
        .collect();
        let names: Vec<&str> = map.names().collect();
        assert_eq!(names, vec!["Id", "Name", "CreatedDate"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map = FieldTypeMap::new();
        map.insert("Id", FieldType::Id);
        map.insert("Amount", FieldType::String);
        map.insert("Amount", FieldType::Currency);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("amount"), Some(&FieldType::Currency));
    }

    #[test]
    fn test_deserialize_from_tag() {
        let t: FieldType = serde_json::from_str("\"date\"").unwrap();
        assert_eq!(t, FieldType::Date);
    }
}
