use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vmindex_config::{Config, StoreBackend};
use vmindex_core::RawRecord;
use vmindex_pipeline::{IngestPipeline, QueryService};

/// Voicemail transcripts ingested when no input file is given.
const SAMPLE_VOICEMAILS: &str = include_str!("../../data/voicemails.json");

/// Input parameters for the Ingest command strategy.
#[derive(Debug, Clone)]
pub struct IngestInput {
    /// JSON array of records; `None` ingests the sample set
    pub file: Option<PathBuf>,
    pub collection: Option<String>,
    pub concurrency: Option<usize>,
    pub store: Option<StoreBackend>,
    /// Search to run once the batch is indexed
    pub query: Option<String>,
    pub top_k: usize,
    /// Fail when any record was skipped
    pub strict: bool,
}

/// Strategy for ingesting a batch of records.
///
/// The first Ctrl-C stops dispatching new records; in-flight records finish
/// and the rest are reported as cancelled. A second Ctrl-C exits at once.
#[derive(Debug, Clone, Copy)]
pub struct IngestStrategy;

impl super::CommandStrategy for IngestStrategy {
    type Input = IngestInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let records = load_records(input.file.as_deref())?;

        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(watch_interrupts(cancel.clone()));
        let outcome = run(&config, input, records, cancel).await;
        watcher.abort();
        outcome
    }
}

async fn run(
    config: &Config,
    input: IngestInput,
    records: Vec<RawRecord>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let backends = super::build_backends(config, input.store)?;
    let extractor = super::build_extractor(config)?;
    let collection = input
        .collection
        .unwrap_or_else(|| config.store.collection.clone());
    let mut pipeline_config = super::pipeline_config(config, collection);
    if let Some(concurrency) = input.concurrency {
        pipeline_config.concurrency = concurrency;
    }
    let call_timeout = pipeline_config.call_timeout;

    let pipeline = IngestPipeline::new(
        extractor,
        backends.embedder.clone(),
        backends.store.clone(),
        pipeline_config,
    );

    let report = pipeline.ingest_with_cancel(records, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(query) = input.query {
        let service =
            QueryService::new(backends.embedder, backends.store).with_call_timeout(call_timeout);
        let matches = service
            .search(&pipeline.config().collection, &query, input.top_k)
            .await?;
        println!();
        super::search::print_matches(&query, &matches);
    }

    if input.strict && !report.is_clean() {
        anyhow::bail!(
            "{} of {} records were skipped",
            report.skipped.len(),
            report.total()
        );
    }

    Ok(())
}

/// What the n-th Ctrl-C of a run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Stop dispatching and let in-flight records finish.
    Drain,
    /// Give up without waiting.
    Exit,
}

const fn interrupt_action(received: usize) -> Interrupt {
    if received <= 1 {
        Interrupt::Drain
    } else {
        Interrupt::Exit
    }
}

/// Exit status for a run abandoned by a second interrupt (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

async fn watch_interrupts(cancel: CancellationToken) {
    let mut received = 0;
    while tokio::signal::ctrl_c().await.is_ok() {
        received += 1;
        match interrupt_action(received) {
            Interrupt::Drain => {
                warn!("Interrupt received, finishing in-flight records (Ctrl-C again to exit)");
                cancel.cancel();
            }
            Interrupt::Exit => {
                warn!("Second interrupt received, exiting");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        }
    }
}

fn load_records(file: Option<&Path>) -> anyhow::Result<Vec<RawRecord>> {
    let Some(path) = file else {
        info!("No input file given, ingesting the sample voicemails");
        return parse_records(SAMPLE_VOICEMAILS).context("Built-in sample set is invalid");
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read input file {}", path.display()))?;
    let records = parse_records(&content)
        .with_context(|| format!("Invalid records in {}", path.display()))?;
    info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

fn parse_records(content: &str) -> anyhow::Result<Vec<RawRecord>> {
    Ok(serde_json::from_str(content)?)
}
