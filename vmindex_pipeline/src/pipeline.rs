//! Batch ingestion: extract, embed, merge metadata, upsert.
//!
//! Records run on a bounded pool of tokio tasks. A failing record is
//! recorded in the report and never stops the batch; only failing to reach
//! the collection up front aborts a run.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vmindex_core::{
    Collection, Embedder, Error, IngestReport, RawRecord, Record, RecordStore, Result, SkipReason,
    SkippedRecord,
};
use vmindex_extract::FieldExtractor;

use crate::retry::{RetryPolicy, bounded, retry_with_backoff};

/// Default collection name used by the sample voicemail set.
pub const DEFAULT_COLLECTION: &str = "voicemail_transcripts";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target collection.
    pub collection: String,
    /// Maximum records processed at once.
    pub concurrency: usize,
    /// Upper bound for each embedding or store call.
    pub call_timeout: Duration,
    /// Backoff for transient embedding and store failures.
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            concurrency: 4,
            call_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

type Outcome = std::result::Result<(), (SkipReason, Error)>;

/// Per-run state shared by every record task.
struct Worker {
    extractor: Arc<FieldExtractor>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn RecordStore>,
    collection: Collection,
    call_timeout: Duration,
    retry: RetryPolicy,
}

impl Worker {
    async fn process(&self, raw: RawRecord) -> Outcome {
        let extracted = self.extractor.extract(&raw.source_text);
        let mut record = Record::new(raw, extracted);
        debug!(
            "Record {}: name={:?}, company={:?}, phones={}",
            record.id,
            record.extracted.name,
            record.extracted.company,
            record.extracted.phone_numbers.len()
        );

        let embedding = retry_with_backoff(
            || {
                bounded(
                    self.call_timeout,
                    self.embedder.embed(&record.source_text),
                    Error::EmbeddingUnavailable,
                )
            },
            &self.retry,
            "Embedding request",
        )
        .await
        .map_err(|e| (SkipReason::EmbeddingFailed, e))?;
        record.embedding = Some(embedding);

        record.stamp();
        let metadata = record.metadata();
        retry_with_backoff(
            || {
                bounded(
                    self.call_timeout,
                    self.store.upsert(
                        &self.collection,
                        &record.id,
                        record.vector(),
                        &record.source_text,
                        &metadata,
                    ),
                    Error::StoreUnavailable,
                )
            },
            &self.retry,
            "Store upsert",
        )
        .await
        .map_err(|e| (SkipReason::StoreFailed, e))?;

        debug!("Indexed record {}", record.id);
        Ok(())
    }
}

/// Orchestrates extraction, embedding and indexing over record batches.
pub struct IngestPipeline {
    extractor: Arc<FieldExtractor>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn RecordStore>,
    config: PipelineConfig,
}

impl IngestPipeline {
    pub fn new(
        extractor: FieldExtractor,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn RecordStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            embedder,
            store,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ingest a batch to completion.
    pub async fn ingest(&self, records: Vec<RawRecord>) -> Result<IngestReport> {
        self.ingest_with_cancel(records, CancellationToken::new())
            .await
    }

    /// Ingest a batch, stopping dispatch once `cancel` fires.
    ///
    /// Records already running finish or time out normally; records never
    /// dispatched are reported as cancelled.
    pub async fn ingest_with_cancel(
        &self,
        records: Vec<RawRecord>,
        cancel: CancellationToken,
    ) -> Result<IngestReport> {
        if records.is_empty() {
            debug!("Empty batch, nothing to ingest");
            return Ok(IngestReport::default());
        }

        let run_id = Uuid::now_v7();
        let collection = bounded(
            self.config.call_timeout,
            self.store.ensure_collection(&self.config.collection),
            Error::StoreUnavailable,
        )
        .await
        .map_err(|e| {
            Error::PipelineAborted(format!(
                "cannot access collection '{}': {e}",
                self.config.collection
            ))
        })?;

        let total = records.len();
        info!(
            "Ingest run {run_id}: {total} records into '{}' with model '{}' (concurrency={})",
            collection.name,
            self.embedder.model(),
            self.config.concurrency
        );

        let worker = Arc::new(Worker {
            extractor: Arc::clone(&self.extractor),
            embedder: Arc::clone(&self.embedder),
            store: Arc::clone(&self.store),
            collection,
            call_timeout: self.config.call_timeout,
            retry: self.config.retry.clone(),
        });
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();

        let mut join_set: JoinSet<(usize, Outcome)> = JoinSet::new();
        let mut dispatched = 0;
        for (index, raw) in records.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    warn!("Ingest run {run_id} cancelled after dispatching {dispatched}/{total} records");
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            dispatched += 1;
            let worker = Arc::clone(&worker);
            join_set.spawn(async move {
                let _permit = permit;
                (index, worker.process(raw).await)
            });
        }

        let mut outcomes: Vec<Option<Outcome>> = vec![None; total];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if let Some(slot) = outcomes.get_mut(index) {
                        *slot = Some(outcome);
                    }
                }
                Err(e) => error!("Ingest worker terminated abnormally: {e}"),
            }
        }

        let report = build_report(ids, outcomes, dispatched);
        info!(
            "Ingest run {run_id} finished: {} succeeded, {} skipped",
            report.succeeded,
            report.skipped.len()
        );
        Ok(report)
    }
}

/// Fold outcomes, indexed by input position, into a report in input order.
fn build_report(ids: Vec<String>, outcomes: Vec<Option<Outcome>>, dispatched: usize) -> IngestReport {
    let mut report = IngestReport::default();
    for (index, (id, outcome)) in ids.into_iter().zip(outcomes).enumerate() {
        let (reason, detail) = match outcome {
            Some(Ok(())) => {
                report.succeeded += 1;
                continue;
            }
            Some(Err((reason, e))) => (reason, e.to_string()),
            None if index >= dispatched => (
                SkipReason::Cancelled,
                "run cancelled before dispatch".to_string(),
            ),
            None => (
                SkipReason::WorkerFailed,
                "worker task ended without an outcome".to_string(),
            ),
        };
        warn!("Skipped record {id}: {reason} ({detail})");
        report.skipped.push(SkippedRecord { id, reason, detail });
    }
    report
}
