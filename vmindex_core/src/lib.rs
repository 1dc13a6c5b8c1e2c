#![deny(
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

pub mod embedding;
mod error;
pub mod record;
mod report;
pub mod store;

pub use embedding::{DimensionGuard, Embedder};
pub use error::{Error, Result};
pub use record::{ExtractedFields, Metadata, MetadataValue, RawRecord, Record};
pub use report::{IngestReport, SkipReason, SkippedRecord};
pub use store::{Collection, Match, QueryHit, RecordStore, rank_hits};
