//! Extraction options and their validation.
//!
//! `ExtractionOptions` is the unvalidated input (library type without clap);
//! `ExtractionOptions::validate` turns it into an immutable
//! `ExtractionConfig` or a `ConfigError`, before any network or file I/O.

use std::path::PathBuf;
use std::time::Duration;

use sync_core::ConfigError;

use crate::casing::KeyCasing;
use crate::query::{parse_raw_query_fields, Incremental, QuerySpec, WATERMARK_PLACEHOLDER};

/// Unvalidated extraction options, as collected from the command line.
#[derive(Clone, Debug, Default)]
pub struct ExtractionOptions {
    pub object: Option<String>,
    pub objects: Vec<String>,
    pub query: Option<String>,
    pub fields: Vec<String>,
    pub filter: Option<String>,
    pub tracking_field: Option<String>,
    pub watermark_file: Option<PathBuf>,
    pub incremental_filter: Option<String>,
    pub key_casing: KeyCasing,
    pub source_tag_field: Option<String>,
    /// Poll interval in seconds; absent or negative means one-shot, zero
    /// runs cycles back to back
    pub interval_secs: Option<i64>,
    pub include_deleted: bool,
    pub stop_on_error: bool,
}

/// What a cycle extracts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// A single object, built from the field list and filters
    Object(String),
    /// Several objects, extracted one after another in this order
    Objects(Vec<String>),
    /// A raw SOQL query, used as is
    RawQuery { soql: String, fields: Vec<String> },
}

/// Incremental extraction settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncrementalConfig {
    pub incremental: Incremental,
    pub watermark_file: PathBuf,
}

/// Validated, immutable extraction configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionConfig {
    pub target: Target,
    /// Explicit field list; empty selects every described field
    pub fields: Vec<String>,
    pub filter: String,
    pub incremental: Option<IncrementalConfig>,
    pub key_casing: KeyCasing,
    pub source_tag_field: Option<String>,
    /// None runs exactly one cycle
    pub interval: Option<Duration>,
    pub include_deleted: bool,
    pub stop_on_error: bool,
}

impl ExtractionOptions {
    pub fn validate(self) -> Result<ExtractionConfig, ConfigError> {
        let target = self.validate_target()?;
        let incremental = self.validate_incremental(&target)?;

        if self.source_tag_field.is_some() && !matches!(target, Target::Objects(_)) {
            return Err(ConfigError::SourceTagWithoutMultipleObjects);
        }

        let interval = match self.interval_secs {
            None => None,
            Some(secs) if secs < 0 => None,
            Some(secs) => Some(Duration::from_secs(secs.unsigned_abs())),
        };

        Ok(ExtractionConfig {
            target,
            fields: self.fields,
            filter: self.filter.unwrap_or_default(),
            incremental,
            key_casing: self.key_casing,
            source_tag_field: self.source_tag_field,
            interval,
            include_deleted: self.include_deleted,
            stop_on_error: self.stop_on_error,
        })
    }

    fn validate_target(&self) -> Result<Target, ConfigError> {
        let given = [
            self.object.is_some(),
            !self.objects.is_empty(),
            self.query.is_some(),
        ]
        .into_iter()
        .filter(|given| *given)
        .count();

        match given {
            0 => return Err(ConfigError::MissingTarget),
            1 => {}
            _ => return Err(ConfigError::AmbiguousTarget),
        }

        if let Some(object) = &self.object {
            return Ok(Target::Object(object.clone()));
        }
        if let Some(soql) = &self.query {
            if self.filter.is_some() {
                return Err(ConfigError::FilterWithRawQuery);
            }
            if !self.fields.is_empty() {
                return Err(ConfigError::FieldsWithRawQuery);
            }
            let fields = parse_raw_query_fields(soql)?;
            return Ok(Target::RawQuery {
                soql: soql.clone(),
                fields,
            });
        }
        Ok(Target::Objects(self.objects.clone()))
    }

    fn validate_incremental(
        &self,
        target: &Target,
    ) -> Result<Option<IncrementalConfig>, ConfigError> {
        let (tracking_field, watermark_file, template) = match (
            &self.tracking_field,
            &self.watermark_file,
            &self.incremental_filter,
        ) {
            (None, None, None) => return Ok(None),
            (Some(t), Some(w), Some(f)) => (t, w, f),
            (t, w, f) => {
                let missing: Vec<&str> = [
                    (t.is_none(), "--tracking-field"),
                    (w.is_none(), "--watermark-file"),
                    (f.is_none(), "--incremental-filter"),
                ]
                .into_iter()
                .filter_map(|(absent, name)| absent.then_some(name))
                .collect();
                return Err(ConfigError::IncompleteIncrementalState {
                    missing: missing.join(", "),
                });
            }
        };

        match target {
            Target::RawQuery { .. } => return Err(ConfigError::IncrementalWithRawQuery),
            Target::Objects(_) => return Err(ConfigError::IncrementalWithMultipleObjects),
            Target::Object(_) => {}
        }

        if !template.contains(WATERMARK_PLACEHOLDER) {
            return Err(ConfigError::TemplateMissingPlaceholder {
                placeholder: WATERMARK_PLACEHOLDER.to_string(),
            });
        }

        Ok(Some(IncrementalConfig {
            incremental: Incremental {
                tracking_field: tracking_field.clone(),
                filter_template: template.clone(),
            },
            watermark_file: watermark_file.clone(),
        }))
    }
}

impl ExtractionConfig {
    /// Whether the scheduler stops after the first cycle.
    pub fn is_one_shot(&self) -> bool {
        self.interval.is_none()
    }

    /// Query settings for one object of a built target.
    pub fn query_spec(&self, object: &str) -> QuerySpec {
        QuerySpec {
            object: object.to_string(),
            fields: self.fields.clone(),
            filter: self.filter.clone(),
            incremental: self.incremental.as_ref().map(|i| i.incremental.clone()),
        }
    }
}
