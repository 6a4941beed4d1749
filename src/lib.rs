//! SalesforceSync Library
//!
//! A scheduled extractor that reads records from Salesforce and writes them
//! as JSON lines, optionally polling on an interval and resuming from a
//! watermark.
//!
//! # Features
//!
//! - Declarative extraction: object, field list and filter become SOQL
//! - Incremental extraction: a tracking field and watermark file bound each query
//! - Polling: fixed-interval cycles with drift correction and clean shutdown
//! - Projection: date/datetime coercion and optional snake_case keys
//!
//! # Crates
//!
//! - `sync_core` - Shared value, event and capability types
//! - `checkpoint` - Watermark persistence
//! - `salesforce_sync_source` - Query builder, projector, cycle and scheduler
//! - `salesforce_sync_client` - REST client
//!
//! # CLI Usage
//!
//! ```bash
//! # One-shot extraction of selected Lead fields
//! salesforce-sync extract --object Lead --fields Id,Email,Status
//!
//! # Incremental polling every 5 minutes
//! salesforce-sync extract --object Lead \
//!   --tracking-field LastModifiedDate \
//!   --watermark-file lead.watermark \
//!   --incremental-filter 'LastModifiedDate > %{last_tracking_field_value}' \
//!   --interval 5m
//!
//! # Show the fields of an object
//! salesforce-sync describe --object Account
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use salesforce_sync_client::ConnectionOptions;
use salesforce_sync_source::{ExtractionOptions, KeyCasing};

pub mod config;
pub mod shutdown;
pub mod sink;

pub use config::{parse_duration_to_secs, parse_timeout};
pub use shutdown::register_shutdown_handlers;
pub use sink::JsonlSink;

#[derive(Parser, Clone)]
pub struct ConnectionArgs {
    /// Connected app consumer key
    #[arg(long, env = "SALESFORCE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Connected app consumer secret
    #[arg(long, env = "SALESFORCE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Salesforce username
    #[arg(long, env = "SALESFORCE_USERNAME")]
    pub username: Option<String>,

    /// Salesforce password
    #[arg(long, env = "SALESFORCE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Security token, appended to the password
    #[arg(long, env = "SALESFORCE_SECURITY_TOKEN", hide_env_values = true)]
    pub security_token: Option<String>,

    /// Log in through test.salesforce.com
    #[arg(long, env = "SALESFORCE_SANDBOX")]
    pub sandbox: bool,

    /// Log in through this URL instead of login/test.salesforce.com
    #[arg(long, env = "SALESFORCE_INSTANCE_URL")]
    pub instance_url: Option<String>,

    /// REST API version, e.g. 60.0
    #[arg(long, env = "SALESFORCE_API_VERSION")]
    pub api_version: Option<String>,

    /// Use the tooling API endpoints
    #[arg(long, env = "SALESFORCE_TOOLING_API")]
    pub tooling_api: bool,

    /// HTTP request timeout (e.g. "30s", "2m")
    #[arg(long, env = "SALESFORCE_TIMEOUT", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,
}

/// Output key casing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum KeyCasingArg {
    /// Keep field names as selected
    #[default]
    Verbatim,
    /// Convert field names to snake_case
    #[value(name = "snake_case")]
    SnakeCase,
}

impl From<KeyCasingArg> for KeyCasing {
    fn from(arg: KeyCasingArg) -> Self {
        match arg {
            KeyCasingArg::Verbatim => KeyCasing::Verbatim,
            KeyCasingArg::SnakeCase => KeyCasing::SnakeCase,
        }
    }
}

#[derive(Parser, Clone)]
pub struct ExtractArgs {
    /// Object to extract
    #[arg(long, env = "SALESFORCE_OBJECT")]
    pub object: Option<String>,

    /// Objects to extract one after another (comma-separated)
    #[arg(long, value_delimiter = ',', env = "SALESFORCE_OBJECTS")]
    pub objects: Vec<String>,

    /// Raw SOQL query, used as is
    #[arg(long, env = "SALESFORCE_QUERY")]
    pub query: Option<String>,

    /// Fields to select (comma-separated); all described fields when omitted
    #[arg(long, value_delimiter = ',', env = "SALESFORCE_FIELDS")]
    pub fields: Vec<String>,

    /// Static SOQL filter expression
    #[arg(long, env = "SALESFORCE_FILTER")]
    pub filter: Option<String>,

    /// Field whose value drives incremental extraction
    #[arg(long, env = "SALESFORCE_TRACKING_FIELD")]
    pub tracking_field: Option<String>,

    /// File holding the last seen tracking value
    #[arg(long, env = "SALESFORCE_WATERMARK_FILE")]
    pub watermark_file: Option<PathBuf>,

    /// Incremental predicate containing %{last_tracking_field_value}
    #[arg(long, env = "SALESFORCE_INCREMENTAL_FILTER")]
    pub incremental_filter: Option<String>,

    /// Output key casing
    #[arg(long, value_enum, default_value_t = KeyCasingArg::Verbatim, env = "SALESFORCE_KEY_CASING")]
    pub key_casing: KeyCasingArg,

    /// Event key stamped with the source object name (--objects only)
    #[arg(long, env = "SALESFORCE_SOURCE_TAG_FIELD")]
    pub source_tag_field: Option<String>,

    /// Poll interval (e.g. "300", "5m"); omit or pass a negative value to run once
    #[arg(
        long,
        allow_hyphen_values = true,
        value_parser = parse_duration_to_secs,
        env = "SALESFORCE_INTERVAL"
    )]
    pub interval: Option<i64>,

    /// Include deleted and archived records
    #[arg(long, env = "SALESFORCE_INCLUDE_DELETED")]
    pub include_deleted: bool,

    /// Stop polling after the first failed cycle
    #[arg(long)]
    pub stop_on_error: bool,

    /// JSON lines output file (appended); stdout when omitted
    #[arg(long, env = "SALESFORCE_OUTPUT")]
    pub output: Option<PathBuf>,
}

// CLI type → library type conversions
impl From<&ConnectionArgs> for ConnectionOptions {
    fn from(args: &ConnectionArgs) -> Self {
        Self {
            client_id: args.client_id.clone().unwrap_or_default(),
            client_secret: args.client_secret.clone().unwrap_or_default(),
            username: args.username.clone().unwrap_or_default(),
            password: args.password.clone().unwrap_or_default(),
            security_token: args.security_token.clone(),
            sandbox: args.sandbox,
            instance_url: args.instance_url.clone(),
            api_version: args.api_version.clone(),
            tooling_api: args.tooling_api,
            timeout: args.timeout,
        }
    }
}

impl From<&ExtractArgs> for ExtractionOptions {
    fn from(args: &ExtractArgs) -> Self {
        Self {
            object: args.object.clone(),
            objects: args.objects.clone(),
            query: args.query.clone(),
            fields: args.fields.clone(),
            filter: args.filter.clone(),
            tracking_field: args.tracking_field.clone(),
            watermark_file: args.watermark_file.clone(),
            incremental_filter: args.incremental_filter.clone(),
            key_casing: args.key_casing.into(),
            source_tag_field: args.source_tag_field.clone(),
            interval_secs: args.interval,
            include_deleted: args.include_deleted,
            stop_on_error: args.stop_on_error,
        }
    }
}
