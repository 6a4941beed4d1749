//! SOQL query construction.
//!
//! The builder turns an object's extraction settings plus the current
//! watermark into a single query string. Given identical inputs it always
//! produces the same string; the only source of variation between runs is the
//! describe order used when no explicit field list is configured.

use sync_core::{ConfigError, FieldTypeMap};

/// Placeholder replaced by the watermark in incremental filter templates.
pub const WATERMARK_PLACEHOLDER: &str = "%{last_tracking_field_value}";

/// Field used for the default descending order in non-incremental queries.
pub const LAST_MODIFIED_FIELD: &str = "LastModifiedDate";

/// Incremental settings shared by the builder and the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incremental {
    /// Field whose monotonic value drives filtering and ordering
    pub tracking_field: String,
    /// Predicate template containing [`WATERMARK_PLACEHOLDER`]
    pub filter_template: String,
}

impl Incremental {
    /// Substitute the watermark into the filter template.
    pub fn render_filter(&self, watermark: &str) -> String {
        self.filter_template.replace(WATERMARK_PLACEHOLDER, watermark)
    }
}

/// Everything needed to build the query for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub object: String,
    /// Explicit field list; empty selects every described field
    pub fields: Vec<String>,
    /// Static SOQL boolean expression; empty for none
    pub filter: String,
    pub incremental: Option<Incremental>,
}

impl QuerySpec {
    /// Fields that will be selected, in order, for the given describe result.
    ///
    /// The tracking field is appended when it is not already selected, so
    /// its value can be read back from the last row.
    pub fn selected_fields(&self, types: &FieldTypeMap) -> Vec<String> {
        let mut fields: Vec<String> = if self.fields.is_empty() {
            types.names().map(str::to_string).collect()
        } else {
            self.fields.clone()
        };

        if let Some(inc) = &self.incremental {
            let already_selected = fields
                .iter()
                .any(|f| f.eq_ignore_ascii_case(&inc.tracking_field));
            if !already_selected {
                fields.push(inc.tracking_field.clone());
            }
        }

        fields
    }

    /// Build the SOQL query for this object.
    ///
    /// The watermark is only used when incremental settings are present;
    /// without one the incremental predicate is skipped and the query is a
    /// full load.
    pub fn build(&self, types: &FieldTypeMap, watermark: Option<&str>) -> String {
        let fields = self.selected_fields(types);
        let mut soql = format!("SELECT {} FROM {}", fields.join(", "), self.object);

        let mut predicates: Vec<String> = Vec::new();
        if !self.filter.trim().is_empty() {
            predicates.push(self.filter.clone());
        }
        if let (Some(inc), Some(watermark)) = (&self.incremental, watermark) {
            predicates.push(inc.render_filter(watermark));
        }
        if !predicates.is_empty() {
            soql.push_str(" WHERE ");
            soql.push_str(&predicates.join(" AND "));
        }

        match &self.incremental {
            Some(inc) => {
                soql.push_str(&format!(" ORDER BY {} ASC", inc.tracking_field));
            }
            None => {
                if fields
                    .iter()
                    .any(|f| f.eq_ignore_ascii_case(LAST_MODIFIED_FIELD))
                {
                    soql.push_str(&format!(" ORDER BY {LAST_MODIFIED_FIELD} DESC"));
                }
            }
        }

        soql
    }
}

/// Extract the field list from the `SELECT ... FROM` clause of a raw query.
///
/// Keywords are matched case-insensitively. Entries are split on commas and
/// trimmed; function wrappers and aliases are kept for the projector to
/// resolve.
pub fn parse_raw_query_fields(raw: &str) -> Result<Vec<String>, ConfigError> {
    let unparsable = || ConfigError::UnparsableRawQuery(raw.to_string());

    let lower = raw.to_ascii_lowercase();
    let select = find_keyword(&lower, "select", 0).ok_or_else(unparsable)?;
    let start = select + "select".len();
    let from = find_keyword(&lower, "from", start).ok_or_else(unparsable)?;

    let fields: Vec<String> = split_top_level(&raw[start..from])
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();

    if fields.is_empty() {
        return Err(unparsable());
    }
    Ok(fields)
}

/// Find a keyword delimited by whitespace (or string boundaries) outside any
/// parentheses, so the `FROM` of a relationship subquery is skipped.
fn find_keyword(haystack: &str, keyword: &str, from: usize) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut depth = 0usize;
    for (offset, c) in haystack[from..].char_indices() {
        let idx = from + offset;
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 && haystack[idx..].starts_with(keyword) => {
                let end = idx + keyword.len();
                let before_ok = idx == 0 || bytes[idx - 1].is_ascii_whitespace();
                let after_ok = end == bytes.len() || bytes[end].is_ascii_whitespace();
                if before_ok && after_ok {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not inside parentheses, e.g. `FORMAT(Amount, 2)`.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
