//! Field projection: raw query rows into normalized events.
//!
//! A projector is prepared once per object from the selected field list and
//! the describe result, then applied to every row the query returns.

use sync_core::{FieldType, FieldTypeMap, NormalizedEvent, Record, UniversalValue};

use crate::casing::KeyCasing;
use crate::datetime::parse_datetime;

/// Transport metadata key attached to every record and nested record.
pub const ATTRIBUTES_KEY: &str = "attributes";

/// How absent values are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Built queries: null or missing values are omitted from the event
    Described,
    /// Raw queries: every selected key is present, null when missing
    Raw,
}

/// One selected field, resolved ahead of time.
#[derive(Debug, Clone, PartialEq)]
struct ProjectedField {
    /// Bare name or alias, used to look the value up in the record
    lookup: String,
    /// Key written to the event
    output_key: String,
    field_type: Option<FieldType>,
}

/// Maps raw records to normalized events for one object.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldProjector {
    fields: Vec<ProjectedField>,
    mode: ProjectionMode,
}

impl FieldProjector {
    pub fn new(
        field_list: &[String],
        types: &FieldTypeMap,
        casing: KeyCasing,
        mode: ProjectionMode,
    ) -> Self {
        let fields = field_list
            .iter()
            .map(|path| {
                let lookup = bare_field_name(path).to_string();
                ProjectedField {
                    output_key: casing.apply(&lookup),
                    field_type: types.get(&lookup).cloned(),
                    lookup,
                }
            })
            .collect();
        Self { fields, mode }
    }

    /// Output keys in projection order.
    pub fn output_keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.output_key.as_str())
    }

    /// Project one record.
    ///
    /// Never fails: a value that cannot be coerced is dropped from the event
    /// and logged, and the rest of the record is still emitted.
    pub fn project(&self, record: &Record) -> NormalizedEvent {
        let mut event = NormalizedEvent::new();

        for field in &self.fields {
            let value = match record.get_path(&field.lookup) {
                Some(v) if !v.is_null() => v,
                _ => {
                    if self.mode == ProjectionMode::Raw {
                        event.insert(field.output_key.clone(), UniversalValue::Null);
                    }
                    continue;
                }
            };

            let is_temporal = field
                .field_type
                .as_ref()
                .is_some_and(FieldType::is_temporal);

            if is_temporal {
                match coerce_temporal(value) {
                    Some(dt) => event.insert(field.output_key.clone(), dt),
                    None => tracing::warn!(
                        "Dropping field {}: value {:?} is not a valid date/time",
                        field.lookup,
                        value
                    ),
                }
                continue;
            }

            let mut value = value.clone();
            value.strip_key(ATTRIBUTES_KEY);
            event.insert(field.output_key.clone(), value);
        }

        event
    }
}

fn coerce_temporal(value: &UniversalValue) -> Option<UniversalValue> {
    match value {
        UniversalValue::Text(s) => parse_datetime(s).map(UniversalValue::DateTime),
        UniversalValue::DateTime(_) => Some(value.clone()),
        _ => None,
    }
}

/// Strip function syntax and aliases from a selected field.
///
/// A trailing alias token wins (`COUNT(Id) total` is `total`); otherwise the
/// first argument of a function wrapper is used (`toLabel(Status)` is
/// `Status`). Plain names and dotted paths are returned unchanged.
pub fn bare_field_name(path: &str) -> &str {
    let path = path.trim();

    let tail_start = path.rfind(')').map(|i| i + 1).unwrap_or(0);
    if let Some(alias) = path[tail_start..].split_whitespace().last() {
        return alias;
    }

    match (path.find('('), path.rfind(')')) {
        (Some(open), Some(close)) if open < close => {
            let inner = &path[open + 1..close];
            let first = inner.split(',').next().unwrap_or(inner);
            bare_field_name(first)
        }
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => Record::from(map),
            _ => unreachable!(),
        }
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|f| f.to_string()).collect()
    }

    fn contact_types() -> FieldTypeMap {
        vec![
            ("Id", FieldType::Id),
            ("CreatedDate", FieldType::DateTime),
            ("Birthdate", FieldType::Date),
            ("LeadSource", FieldType::Picklist),
            ("AccountId", FieldType::Reference),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_bare_field_name() {
        assert_eq!(bare_field_name("Name"), "Name");
        assert_eq!(bare_field_name("Owner.Name"), "Owner.Name");
        assert_eq!(bare_field_name("toLabel(Status)"), "Status");
        assert_eq!(bare_field_name("COUNT(Id) total"), "total");
        assert_eq!(bare_field_name("FORMAT(Amount, 2)"), "Amount");
        assert_eq!(bare_field_name("convertCurrency(toLabel(Amount))"), "Amount");
        assert_eq!(bare_field_name("  Name  "), "Name");
        assert_eq!(
            bare_field_name("(SELECT LastName FROM Contacts)"),
            "Contacts"
        );
    }

    #[test]
    fn test_date_fields_are_coerced() {
        let projector = FieldProjector::new(
            &fields(&["Id", "CreatedDate", "Birthdate"]),
            &contact_types(),
            KeyCasing::Verbatim,
            ProjectionMode::Described,
        );
        let event = projector.project(&record(json!({
            "Id": "003",
            "CreatedDate": "2024-01-15T10:30:00.000+0000",
            "Birthdate": "1990-05-01"
        })));

        let created = event.get("CreatedDate").and_then(|v| v.as_datetime()).unwrap();
        assert_eq!(created.to_rfc3339(), "2024-01-15T10:30:00+00:00");
        let birth = event.get("Birthdate").and_then(|v| v.as_datetime()).unwrap();
        assert_eq!(birth.to_rfc3339(), "1990-05-01T00:00:00+00:00");
    }

    #[test]
    fn test_unparsable_date_is_dropped_not_fatal() {
        let projector = FieldProjector::new(
            &fields(&["Id", "CreatedDate"]),
            &contact_types(),
            KeyCasing::Verbatim,
            ProjectionMode::Described,
        );
        let event = projector.project(&record(json!({
            "Id": "003",
            "CreatedDate": "yesterday"
        })));

        assert_eq!(event.get("Id"), Some(&UniversalValue::from("003")));
        assert!(!event.contains_key("CreatedDate"));
    }

    #[test]
    fn test_other_types_pass_through() {
        let projector = FieldProjector::new(
            &fields(&["LeadSource", "NumberOfEmployees"]),
            &contact_types(),
            KeyCasing::Verbatim,
            ProjectionMode::Described,
        );
        let event = projector.project(&record(json!({
            "LeadSource": "Web",
            "NumberOfEmployees": 250
        })));

        assert_eq!(event.get("LeadSource"), Some(&UniversalValue::from("Web")));
        assert_eq!(event.get("NumberOfEmployees"), Some(&UniversalValue::Int64(250)));
    }

    #[test]
    fn test_nested_reference_attributes_are_stripped() {
        let projector = FieldProjector::new(
            &fields(&["Account"]),
            &FieldTypeMap::new(),
            KeyCasing::Verbatim,
            ProjectionMode::Described,
        );
        let event = projector.project(&record(json!({
            "attributes": {"type": "Contact"},
            "Account": {
                "attributes": {"type": "Account", "url": "/x"},
                "Name": "Acme",
                "Owner": {"attributes": {"type": "User"}, "Alias": "ada"}
            }
        })));

        let account = event.get("Account").and_then(|v| v.as_object()).unwrap();
        assert!(!account.contains_key("attributes"));
        assert_eq!(account.get("Name"), Some(&UniversalValue::from("Acme")));
        let owner = account.get("Owner").and_then(|v| v.as_object()).unwrap();
        assert!(!owner.contains_key("attributes"));
    }

    #[test]
    fn test_null_and_missing_omitted_in_described_mode() {
        let projector = FieldProjector::new(
            &fields(&["Id", "LeadSource", "Account.Name"]),
            &contact_types(),
            KeyCasing::Verbatim,
            ProjectionMode::Described,
        );
        let event = projector.project(&record(json!({
            "Id": "003",
            "LeadSource": null,
            "Account": null
        })));

        let keys: Vec<&str> = event.keys().collect();
        assert_eq!(keys, vec!["Id"]);
    }

    #[test]
    fn test_null_and_missing_present_in_raw_mode() {
        let projector = FieldProjector::new(
            &fields(&["Id", "LeadSource", "Account.Name"]),
            &FieldTypeMap::new(),
            KeyCasing::Verbatim,
            ProjectionMode::Raw,
        );
        let event = projector.project(&record(json!({
            "Id": "003",
            "LeadSource": null
        })));

        assert_eq!(event.get("LeadSource"), Some(&UniversalValue::Null));
        assert_eq!(event.get("Account.Name"), Some(&UniversalValue::Null));
    }

    #[test]
    fn test_dotted_path_and_snake_case_keys() {
        let projector = FieldProjector::new(
            &fields(&["Id", "Owner.FirstName", "COUNT(Id) RecordCount"]),
            &contact_types(),
            KeyCasing::SnakeCase,
            ProjectionMode::Described,
        );
        let event = projector.project(&record(json!({
            "Id": "003",
            "Owner": {"attributes": {"type": "User"}, "FirstName": "Ada"},
            "RecordCount": 7
        })));

        let keys: Vec<&str> = event.keys().collect();
        assert_eq!(keys, vec!["id", "owner_first_name", "record_count"]);
        assert_eq!(event.get("owner_first_name"), Some(&UniversalValue::from("Ada")));
        assert_eq!(event.get("record_count"), Some(&UniversalValue::Int64(7)));
    }

    #[test]
    fn test_output_keys_follow_field_order() {
        let projector = FieldProjector::new(
            &fields(&["CreatedBy", "Id"]),
            &FieldTypeMap::new(),
            KeyCasing::SnakeCase,
            ProjectionMode::Raw,
        );
        let keys: Vec<&str> = projector.output_keys().collect();
        assert_eq!(keys, vec!["created_by", "id"]);
    }
}
