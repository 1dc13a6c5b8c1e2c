use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use vmindex_core::{Embedder, Error, Match, RecordStore, Result};

use crate::retry::bounded;

/// Semantic search over an indexed collection.
pub struct QueryService {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn RecordStore>,
    call_timeout: Duration,
}

impl QueryService {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            embedder,
            store,
            call_timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub const fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Embed `query_text` with the ingestion model and return up to `top_k`
    /// matches, most similar first. A collection that does not exist yields
    /// no matches and is not created. Errors propagate unchanged.
    pub async fn search(
        &self,
        collection: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<Match>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let vector = bounded(
            self.call_timeout,
            self.embedder.embed(query_text),
            Error::EmbeddingUnavailable,
        )
        .await?;
        let Some(collection) = bounded(
            self.call_timeout,
            self.store.find_collection(collection),
            Error::StoreUnavailable,
        )
        .await?
        else {
            info!("Collection '{collection}' does not exist, nothing to search");
            return Ok(Vec::new());
        };
        let hits = bounded(
            self.call_timeout,
            self.store.query(&collection, &vector, top_k),
            Error::StoreUnavailable,
        )
        .await?;

        debug!(
            "Query '{query_text}' against '{}' returned {} hits",
            collection.name,
            hits.len()
        );
        info!("Search found {} matches (top_k={top_k})", hits.len());

        Ok(hits
            .into_iter()
            .take(top_k)
            .map(|hit| Match {
                score: self.store.distance_to_score(hit.distance),
                id: hit.id,
                document: hit.document,
                metadata: hit.metadata,
                distance: hit.distance,
            })
            .collect())
    }
}
