use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmbeddingFailed,
    StoreFailed,
    /// Never dispatched because the run was cancelled.
    Cancelled,
    /// The record's worker task ended without producing an outcome.
    WorkerFailed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmbeddingFailed => write!(f, "embedding_failed"),
            Self::StoreFailed => write!(f, "store_failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::WorkerFailed => write!(f, "worker_failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub id: String,
    pub reason: SkipReason,
    pub detail: String,
}

/// Outcome of one ingest run. `skipped` follows input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub succeeded: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl IngestReport {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.skipped.len()
    }

    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Number of skips recorded with the given reason.
    #[must_use]
    pub fn count(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|s| s.reason == reason).count()
    }
}
