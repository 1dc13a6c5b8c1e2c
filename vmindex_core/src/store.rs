//! Vector store seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Metadata, Result};

/// Handle to a named collection. `id` is whatever the backing store uses
/// to address it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub id: String,
}

/// One nearest-neighbour result as reported by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub distance: f32,
}

/// A search result with a relevance score; higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub distance: f32,
    pub score: f32,
}

/// A vector-capable record store.
///
/// Upserts replace any record sharing the id and are atomic per id.
/// Concurrent upserts of the same id are last-writer-wins.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the collection if missing; idempotent.
    async fn ensure_collection(&self, name: &str) -> Result<Collection>;

    /// Look up an existing collection without creating it.
    async fn find_collection(&self, name: &str) -> Result<Option<Collection>>;

    async fn upsert(
        &self,
        collection: &Collection,
        id: &str,
        vector: &[f32],
        document: &str,
        metadata: &Metadata,
    ) -> Result<()>;

    /// At most `top_k` hits by ascending distance, ties in insertion order.
    async fn query(
        &self,
        collection: &Collection,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<QueryHit>>;

    /// Map a distance onto a score. A larger distance never yields a higher
    /// score.
    fn distance_to_score(&self, distance: f32) -> f32 {
        1.0 / (1.0 + distance.max(0.0))
    }
}

/// Stable sort by ascending distance, then truncate to `top_k`.
///
/// The sort is stable so hits already in insertion order keep it on ties.
#[must_use]
pub fn rank_hits(mut hits: Vec<QueryHit>, top_k: usize) -> Vec<QueryHit> {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits.truncate(top_k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, distance: f32) -> QueryHit {
        QueryHit {
            id: id.to_string(),
            document: String::new(),
            metadata: Metadata::new(),
            distance,
        }
    }

    #[test]
    fn ranking_is_stable_on_ties() {
        let ranked = rank_hits(
            vec![hit("a", 0.5), hit("b", 0.1), hit("c", 0.5), hit("d", 0.1)],
            3,
        );
        let ids: Vec<_> = ranked.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
    }

    #[test]
    fn zero_top_k_is_empty() {
        assert!(rank_hits(vec![hit("a", 0.0)], 0).is_empty());
    }

    struct Nothing;

    #[async_trait]
    impl RecordStore for Nothing {
        async fn ensure_collection(&self, name: &str) -> Result<Collection> {
            Ok(Collection {
                name: name.to_string(),
                id: name.to_string(),
            })
        }

        async fn find_collection(&self, _name: &str) -> Result<Option<Collection>> {
            Ok(None)
        }

        async fn upsert(
            &self,
            _collection: &Collection,
            _id: &str,
            _vector: &[f32],
            _document: &str,
            _metadata: &Metadata,
        ) -> Result<()> {
            Ok(())
        }

        async fn query(
            &self,
            _collection: &Collection,
            _vector: &[f32],
            _top_k: usize,
        ) -> Result<Vec<QueryHit>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn default_score_decreases_with_distance() {
        let store = Nothing;
        assert!((store.distance_to_score(0.0) - 1.0).abs() < f32::EPSILON);
        assert!(store.distance_to_score(0.2) > store.distance_to_score(0.4));
        assert!(store.distance_to_score(1.5) > store.distance_to_score(2.0));
    }
}
