//! Extraction cycle: build, query, project, emit, checkpoint.
//!
//! The cycle is prepared once by [`ExtractionCycle::initialize`], which
//! describes every configured object through the API client it is handed.
//! Each call to [`ExtractionCycle::run_once`] then performs one full pass.

use anyhow::{Context, Result};
use async_trait::async_trait;
use checkpoint::WatermarkStore;
use sync_core::{EventSink, FieldTypeMap, Record, SalesforceApi, UniversalValue};

use crate::config::{ExtractionConfig, Target};
use crate::projector::{FieldProjector, ProjectionMode};
use crate::query::QuerySpec;
use crate::scheduler::PollCycle;

/// How the SOQL for one plan is obtained.
#[derive(Debug, Clone)]
enum QuerySource {
    Built { spec: QuerySpec, types: FieldTypeMap },
    Raw(String),
}

/// Everything needed to extract one object (or the raw query) per cycle.
#[derive(Debug, Clone)]
struct ObjectPlan {
    label: String,
    source: QuerySource,
    projector: FieldProjector,
    /// Literal key and value stamped onto every event
    tag: Option<(String, String)>,
}

impl ObjectPlan {
    fn soql(&self, watermark: Option<&str>) -> String {
        match &self.source {
            QuerySource::Built { spec, types } => spec.build(types, watermark),
            QuerySource::Raw(soql) => soql.clone(),
        }
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub events_emitted: usize,
    /// Watermark written at the end of the cycle, if any
    pub watermark: Option<String>,
}

/// Orchestrates one extraction pass over every configured object.
pub struct ExtractionCycle<A: SalesforceApi, W: WatermarkStore, S: EventSink> {
    api: A,
    store: W,
    sink: S,
    plans: Vec<ObjectPlan>,
    tracking_field: Option<String>,
    include_deleted: bool,
}

impl<A: SalesforceApi, W: WatermarkStore, S: EventSink> ExtractionCycle<A, W, S> {
    /// Describe every configured object and prepare its query and projector.
    ///
    /// Raw queries are not described; their fields come from the query text.
    pub async fn initialize(api: A, config: &ExtractionConfig, store: W, sink: S) -> Result<Self> {
        let mut plans = Vec::new();

        match &config.target {
            Target::Object(object) => {
                plans.push(Self::describe_plan(&api, config, object, None).await?);
            }
            Target::Objects(objects) => {
                for object in objects {
                    let tag = config
                        .source_tag_field
                        .as_ref()
                        .map(|key| (key.clone(), object.clone()));
                    plans.push(Self::describe_plan(&api, config, object, tag).await?);
                }
            }
            Target::RawQuery { soql, fields } => {
                let projector = FieldProjector::new(
                    fields,
                    &FieldTypeMap::new(),
                    config.key_casing,
                    ProjectionMode::Raw,
                );
                plans.push(ObjectPlan {
                    label: "raw query".to_string(),
                    source: QuerySource::Raw(soql.clone()),
                    projector,
                    tag: None,
                });
            }
        }

        Ok(Self {
            api,
            store,
            sink,
            plans,
            tracking_field: config
                .incremental
                .as_ref()
                .map(|i| i.incremental.tracking_field.clone()),
            include_deleted: config.include_deleted,
        })
    }

    async fn describe_plan(
        api: &A,
        config: &ExtractionConfig,
        object: &str,
        tag: Option<(String, String)>,
    ) -> Result<ObjectPlan> {
        let types = api
            .describe(object)
            .await
            .with_context(|| format!("Failed to describe {object}"))?;
        tracing::info!("Described {}: {} fields", object, types.len());

        let spec = config.query_spec(object);
        let fields = spec.selected_fields(&types);
        let projector = FieldProjector::new(
            &fields,
            &types,
            config.key_casing,
            ProjectionMode::Described,
        );

        Ok(ObjectPlan {
            label: object.to_string(),
            source: QuerySource::Built { spec, types },
            projector,
            tag,
        })
    }

    /// Run one cycle.
    ///
    /// A failed load, query or emit aborts the cycle before the watermark is
    /// touched, so the same window is queried again next time. A failed
    /// watermark write is logged and does not fail the cycle: the events
    /// have already been delivered.
    pub async fn run_once(&mut self) -> Result<CycleSummary> {
        let watermark = match &self.tracking_field {
            Some(_) => self
                .store
                .load()
                .await
                .context("Failed to load watermark")?
                .and_then(normalize_watermark),
            None => None,
        };
        match &watermark {
            Some(w) => tracing::debug!("Resuming from watermark {w}"),
            None if self.tracking_field.is_some() => {
                tracing::info!("No watermark found, running a full load")
            }
            None => {}
        }

        let mut summary = CycleSummary::default();
        let mut latest: Option<String> = None;

        for plan in &self.plans {
            let soql = plan.soql(watermark.as_deref());
            tracing::debug!("Querying {}: {}", plan.label, soql);

            let result = if self.include_deleted {
                self.api.query_all(&soql).await
            } else {
                self.api.query(&soql).await
            };
            let rows = result.with_context(|| format!("Query for {} failed", plan.label))?;

            for row in &rows {
                let mut event = plan.projector.project(row);
                if let Some((key, object)) = &plan.tag {
                    event.insert(key.clone(), UniversalValue::from(object.as_str()));
                }
                self.sink
                    .emit(event)
                    .await
                    .with_context(|| format!("Failed to emit {} event", plan.label))?;
                summary.events_emitted += 1;

                if let Some(value) = self.tracking_value(row) {
                    latest = Some(value);
                }
            }

            tracing::info!("Extracted {} rows from {}", rows.len(), plan.label);
        }

        self.sink.flush().await.context("Failed to flush sink")?;

        if let Some(value) = latest {
            match self.store.save(&value).await {
                Ok(()) => summary.watermark = Some(value),
                Err(e) => tracing::error!("Failed to store watermark {value}: {e:#}"),
            }
        }

        Ok(summary)
    }

    fn tracking_value(&self, row: &Record) -> Option<String> {
        let field = self.tracking_field.as_deref()?;
        row.get_path(field)?.to_watermark_string()
    }

    /// The sink this cycle emits to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Drop trailing whitespace, such as a newline added by an editor.
/// An empty file counts as no watermark.
fn normalize_watermark(raw: String) -> Option<String> {
    let trimmed = raw.trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[async_trait]
impl<A: SalesforceApi, W: WatermarkStore, S: EventSink> PollCycle for ExtractionCycle<A, W, S> {
    async fn run_cycle(&mut self) -> Result<()> {
        let summary = self.run_once().await?;
        match &summary.watermark {
            Some(w) => tracing::info!(
                "Cycle complete: {} events, watermark {}",
                summary.events_emitted,
                w
            ),
            None => tracing::info!("Cycle complete: {} events", summary.events_emitted),
        }
        Ok(())
    }
}
