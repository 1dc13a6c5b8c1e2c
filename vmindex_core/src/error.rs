use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("malformed embedding: {0}")]
    EmbeddingMalformed(String),

    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("pipeline aborted: {0}")]
    PipelineAborted(String),
}

impl Error {
    /// Whether another attempt at the same call could succeed.
    ///
    /// Connectivity failures are transient; a malformed payload or a
    /// dimensionality conflict will fail the same way every time.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::EmbeddingUnavailable(_) | Self::StoreUnavailable(_))
    }
}
