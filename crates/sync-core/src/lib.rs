//! Core types for the salesforce-sync connector.
//!
//! This crate provides the foundational types shared by the source, the
//! REST client and the CLI:
//!
//! - [`UniversalValue`] - Tagged value for a single field of a remote record
//! - [`Record`] - One row returned by a query, with dotted-path lookup
//! - [`FieldType`] / [`FieldTypeMap`] - Field metadata from the describe call
//! - [`NormalizedEvent`] - Ordered, projected output record
//! - [`ConfigError`] - Invalid option combinations detected at startup
//! - [`SalesforceApi`] / [`EventSink`] - Capabilities the extraction core consumes
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── salesforce-sync-client  (implements SalesforceApi over REST)
//!    ├─── salesforce-sync-source  (query builder, projector, cycle, scheduler)
//!    └─── salesforce-sync         (CLI, implements EventSink for JSON lines)
//! ```
//!
//! # Example
//!
//! ```rust
//! use sync_core::{Record, UniversalValue};
//!
//! let record = Record::new()
//!     .with("Id", "001")
//!     .with("Name", "Acme");
//! assert_eq!(record.get_path("Name"), Some(&UniversalValue::from("Acme")));
//! ```

pub mod error;
pub mod event;
pub mod traits;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use error::ConfigError;
pub use event::NormalizedEvent;
pub use traits::{EventSink, MemorySink, SalesforceApi};
pub use types::{FieldType, FieldTypeMap};
pub use values::{Record, UniversalValue};
