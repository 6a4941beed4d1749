//! Configuration errors.
//!
//! Every variant is detected while validating options at startup, before any
//! network or file I/O happens. None of them is ever retried.

/// Invalid combination of extraction options.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("--instance-url and --sandbox are mutually exclusive")]
    InstanceUrlWithSandbox,

    #[error(
        "incremental extraction needs --tracking-field, --watermark-file and \
         --incremental-filter together (missing: {missing})"
    )]
    IncompleteIncrementalState { missing: String },

    #[error("exactly one of --object, --objects or --query may be given")]
    AmbiguousTarget,

    #[error("one of --object, --objects or --query is required")]
    MissingTarget,

    #[error("incremental extraction is not supported with --query")]
    IncrementalWithRawQuery,

    #[error("incremental extraction is not supported with --objects")]
    IncrementalWithMultipleObjects,

    #[error("--incremental-filter must contain the placeholder {placeholder}")]
    TemplateMissingPlaceholder { placeholder: String },

    #[error("--source-tag-field is only valid with --objects")]
    SourceTagWithoutMultipleObjects,

    #[error("--filter cannot be combined with --query; put the condition in the query")]
    FilterWithRawQuery,

    #[error("--fields cannot be combined with --query; list the fields in the query")]
    FieldsWithRawQuery,

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("raw query has no SELECT ... FROM field list: {0}")]
    UnparsableRawQuery(String),
}
