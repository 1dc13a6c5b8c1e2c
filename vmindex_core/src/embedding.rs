//! Embedding provider seam.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{Error, Result};

/// Turns text into a fixed-length vector.
///
/// Implementations report transport problems as
/// [`Error::EmbeddingUnavailable`] and bad payloads as
/// [`Error::EmbeddingMalformed`]. They do not retry.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn model(&self) -> &str;
}

/// Tracks the dimensionality established for a collection's vectors.
///
/// The first accepted vector fixes the length unless one was configured
/// up front; every later vector must match it.
#[derive(Debug, Default)]
pub struct DimensionGuard {
    // 0 means not yet established
    established: AtomicUsize,
}

impl DimensionGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            established: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub const fn fixed(dimensions: usize) -> Self {
        Self {
            established: AtomicUsize::new(dimensions),
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> Option<usize> {
        match self.established.load(Ordering::Acquire) {
            0 => None,
            n => Some(n),
        }
    }

    pub fn check(&self, vector: &[f32]) -> Result<()> {
        if vector.is_empty() {
            return Err(Error::EmbeddingMalformed(
                "provider returned an empty vector".to_string(),
            ));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::EmbeddingMalformed(
                "vector contains non-finite values".to_string(),
            ));
        }

        let len = vector.len();
        match self
            .established
            .compare_exchange(0, len, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(existing) if existing == len => Ok(()),
            Err(existing) => Err(Error::EmbeddingMalformed(format!(
                "expected {existing} dimensions, got {len}"
            ))),
        }
    }
}
