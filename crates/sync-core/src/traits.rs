//! Capabilities the extraction core consumes.
//!
//! The REST client implements [`SalesforceApi`]; output destinations
//! implement [`EventSink`]. Tests substitute in-memory versions of both.

use crate::event::NormalizedEvent;
use crate::types::FieldTypeMap;
use crate::values::Record;
use anyhow::Result;
use async_trait::async_trait;

/// Read access to a Salesforce org.
#[async_trait]
pub trait SalesforceApi: Send + Sync {
    /// Field names and types of an object, in the order the API lists them.
    async fn describe(&self, object: &str) -> Result<FieldTypeMap>;

    /// Run a SOQL query and return every row, following pagination.
    async fn query(&self, soql: &str) -> Result<Vec<Record>>;

    /// Like [`SalesforceApi::query`], but also returns deleted and archived rows.
    async fn query_all(&self, soql: &str) -> Result<Vec<Record>>;
}

/// Append-only destination for normalized events.
///
/// Events must be delivered in the order they are emitted.
#[async_trait]
pub trait EventSink: Send {
    async fn emit(&mut self, event: NormalizedEvent) -> Result<()>;

    /// Called once at the end of every cycle.
    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<NormalizedEvent>,
    pub flushes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn emit(&mut self, event: NormalizedEvent) -> Result<()> {
        self.events.push(event);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
