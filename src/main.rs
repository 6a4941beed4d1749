//! Command-line interface for salesforce-sync
//!
//! # Usage Examples
//!
//! ## One-shot extraction
//! ```bash
//! salesforce-sync extract \
//!   --client-id ... --client-secret ... --username ... --password ... \
//!   --object Lead --fields Id,Email,Status,LastModifiedDate \
//!   --filter "IsConverted = false" \
//!   --output leads.jsonl
//! ```
//!
//! ## Incremental polling
//! ```bash
//! salesforce-sync extract --object Lead \
//!   --tracking-field LastModifiedDate \
//!   --watermark-file lead.watermark \
//!   --incremental-filter 'LastModifiedDate > %{last_tracking_field_value}' \
//!   --interval 5m --key-casing snake_case
//! ```
//!
//! ## Several objects in one cycle
//! ```bash
//! salesforce-sync extract --objects Account,Contact --source-tag-field sobject
//! ```
//!
//! ## Field discovery
//! ```bash
//! salesforce-sync describe --object Opportunity
//! ```
//!
//! Every option can also be set through its `SALESFORCE_*` environment
//! variable. Set `RUST_LOG=info` to see cycle progress on stderr.

use checkpoint::{FileWatermarkStore, NullWatermarkStore};
use clap::{Parser, Subcommand};
use salesforce_sync::{register_shutdown_handlers, ConnectionArgs, ExtractArgs, JsonlSink};
use salesforce_sync_client::{ConnectionOptions, SalesforceClient};
use salesforce_sync_source::{run_extraction, ExtractionOptions};
use sync_core::SalesforceApi;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "salesforce-sync")]
#[command(about = "Extract Salesforce records as JSON lines, once or on an interval")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records and write them as JSON lines
    Extract {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        extract: ExtractArgs,
    },
    /// Print the fields of an object with their types
    Describe {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Object to describe
        #[arg(long)]
        object: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            connection,
            extract,
        } => run_extract(connection, extract).await,
        Commands::Describe { connection, object } => run_describe(connection, object).await,
    }
}

async fn run_extract(connection: ConnectionArgs, extract: ExtractArgs) -> anyhow::Result<()> {
    // Validate everything before touching the network or the filesystem
    let connection = ConnectionOptions::from(&connection).validate()?;
    let config = ExtractionOptions::from(&extract).validate()?;
    tracing::debug!("Connection: {connection:?}");

    let sink = match &extract.output {
        Some(path) => JsonlSink::append_to(path).await?,
        None => JsonlSink::stdout(),
    };

    let client = SalesforceClient::connect(&connection).await?;

    let cancel = CancellationToken::new();
    register_shutdown_handlers(cancel.clone());

    let report = match &config.incremental {
        Some(incremental) => {
            let store = FileWatermarkStore::new(&incremental.watermark_file);
            run_extraction(client, &config, store, sink, cancel).await?
        }
        None => run_extraction(client, &config, NullWatermarkStore, sink, cancel).await?,
    };

    tracing::info!(
        "Extraction finished: {} cycles completed, {} failed",
        report.cycles_completed,
        report.cycles_failed
    );
    Ok(())
}

async fn run_describe(connection: ConnectionArgs, object: String) -> anyhow::Result<()> {
    let connection = ConnectionOptions::from(&connection).validate()?;
    let client = SalesforceClient::connect(&connection).await?;

    let types = client.describe(&object).await?;
    for (name, field_type) in types.iter() {
        println!("{name}\t{field_type}");
    }
    Ok(())
}
