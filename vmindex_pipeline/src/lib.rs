//! Ingestion and search orchestration.
//!
//! [`IngestPipeline`] turns raw records into indexed records through the
//! [`Embedder`](vmindex_core::Embedder) and
//! [`RecordStore`](vmindex_core::RecordStore) seams; [`QueryService`] answers
//! similarity queries against the same collection.

#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod pipeline;
mod query;
mod retry;

pub use pipeline::{DEFAULT_COLLECTION, IngestPipeline, PipelineConfig};
pub use query::QueryService;
pub use retry::{RetryPolicy, bounded, retry_with_backoff};
