//! Incremental Salesforce extraction for salesforce-sync
//!
//! Provides the polling core of the connector:
//!
//! - [`QuerySpec`] builds SOQL from an object, field list, filters and the
//!   current watermark
//! - [`FieldProjector`] turns query rows into [`sync_core::NormalizedEvent`]s
//! - [`ExtractionCycle`] ties query, projection, sink and watermark together
//! - [`PollScheduler`] repeats the cycle on a fixed interval until stopped
//!
//! The API client and the event sink are supplied by the caller through the
//! [`sync_core::SalesforceApi`] and [`sync_core::EventSink`] traits.

mod casing;
pub mod config;
mod cycle;
mod datetime;
mod projector;
pub mod query;
mod scheduler;

pub use casing::{to_snake_case, KeyCasing};
pub use config::{ExtractionConfig, ExtractionOptions, IncrementalConfig, Target};
pub use cycle::{CycleSummary, ExtractionCycle};
pub use datetime::parse_datetime;
pub use projector::{bare_field_name, FieldProjector, ProjectionMode};
pub use query::{parse_raw_query_fields, Incremental, QuerySpec, WATERMARK_PLACEHOLDER};
pub use scheduler::{PollCycle, PollScheduler, ScheduleReport, SchedulerState};

use anyhow::Result;
use checkpoint::WatermarkStore;
use sync_core::{EventSink, SalesforceApi};
use tokio_util::sync::CancellationToken;

/// Run extraction until one-shot completion or cancellation.
///
/// # Arguments
/// * `api` - Salesforce API client, already authenticated
/// * `config` - Validated extraction configuration
/// * `store` - Watermark store (a `NullWatermarkStore` when not incremental)
/// * `sink` - Destination for normalized events
/// * `cancel` - Token that stops the loop at the next safe point
pub async fn run_extraction<A, W, S>(
    api: A,
    config: &ExtractionConfig,
    store: W,
    sink: S,
    cancel: CancellationToken,
) -> Result<ScheduleReport>
where
    A: SalesforceApi,
    W: WatermarkStore,
    S: EventSink,
{
    tracing::info!("Starting Salesforce extraction");
    match config.interval {
        Some(interval) => tracing::info!("Polling every {:?}", interval),
        None => tracing::info!("Running a single extraction cycle"),
    }

    let mut cycle = ExtractionCycle::initialize(api, config, store, sink).await?;
    let mut scheduler =
        PollScheduler::new(config.interval, cancel).with_stop_on_error(config.stop_on_error);
    scheduler.run(&mut cycle).await
}
