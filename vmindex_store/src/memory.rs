use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use rayon::prelude::*;
use tracing::{debug, info};
use vmindex_core::{Collection, Error, Metadata, QueryHit, RecordStore, Result, rank_hits};

use crate::scoring;

#[derive(Debug, Clone)]
struct Entry {
    // first-insertion order, kept across replacements
    seq: u64,
    vector: Vec<f32>,
    document: String,
    metadata: Metadata,
}

#[derive(Debug, Default)]
struct CollectionState {
    dimensions: Option<usize>,
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

impl CollectionState {
    fn check_dimensions(&self, actual: usize) -> Result<()> {
        match self.dimensions {
            Some(expected) if expected != actual => {
                Err(Error::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

/// In-memory [`RecordStore`] using cosine distance.
///
/// Each upsert holds the write lock for its whole update, so readers never
/// see a partially written record. A replaced record keeps the position it
/// had when first inserted for tie-breaking.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, CollectionState>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, CollectionState>>> {
        self.collections
            .read()
            .map_err(|_| Error::StoreUnavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, CollectionState>>> {
        self.collections
            .write()
            .map_err(|_| Error::StoreUnavailable("store lock poisoned".to_string()))
    }

    /// Number of records in a collection; 0 if it does not exist.
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.read()
            .map(|c| c.get(collection).map_or(0, |state| state.entries.len()))
            .unwrap_or(0)
    }

    /// Stored document and metadata for an id.
    #[must_use]
    pub fn get(&self, collection: &str, id: &str) -> Option<(String, Metadata)> {
        let collections = self.read().ok()?;
        let entry = collections.get(collection)?.entries.get(id)?;
        Some((entry.document.clone(), entry.metadata.clone()))
    }

    /// Established dimensionality of a collection, if any record was written.
    #[must_use]
    pub fn dimensions(&self, collection: &str) -> Option<usize> {
        self.read().ok()?.get(collection)?.dimensions
    }
}

fn missing(collection: &Collection) -> Error {
    Error::StoreUnavailable(format!("collection '{}' does not exist", collection.name))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ensure_collection(&self, name: &str) -> Result<Collection> {
        let mut collections = self.write()?;
        if !collections.contains_key(name) {
            info!("Creating in-memory collection '{name}'");
            collections.insert(name.to_string(), CollectionState::default());
        }
        Ok(Collection {
            name: name.to_string(),
            id: name.to_string(),
        })
    }

    async fn find_collection(&self, name: &str) -> Result<Option<Collection>> {
        Ok(self.read()?.contains_key(name).then(|| Collection {
            name: name.to_string(),
            id: name.to_string(),
        }))
    }

    async fn upsert(
        &self,
        collection: &Collection,
        id: &str,
        vector: &[f32],
        document: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        let mut collections = self.write()?;
        let state = collections
            .get_mut(&collection.id)
            .ok_or_else(|| missing(collection))?;
        state.check_dimensions(vector.len())?;
        state.dimensions = Some(vector.len());

        let seq = match state.entries.get(id) {
            Some(existing) => existing.seq,
            None => {
                let seq = state.next_seq;
                state.next_seq += 1;
                seq
            }
        };
        state.entries.insert(
            id.to_string(),
            Entry {
                seq,
                vector: vector.to_vec(),
                document: document.to_string(),
                metadata: metadata.clone(),
            },
        );

        debug!("Upserted '{id}' into '{}'", collection.name);
        Ok(())
    }

    async fn query(
        &self,
        collection: &Collection,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<QueryHit>> {
        let collections = self.read()?;
        let state = collections
            .get(&collection.id)
            .ok_or_else(|| missing(collection))?;
        state.check_dimensions(vector.len())?;

        let mut scored: Vec<(u64, QueryHit)> = state
            .entries
            .par_iter()
            .map(|(id, entry)| {
                (
                    entry.seq,
                    QueryHit {
                        id: id.clone(),
                        document: entry.document.clone(),
                        metadata: entry.metadata.clone(),
                        distance: scoring::cosine_distance(vector, &entry.vector),
                    },
                )
            })
            .collect();
        scored.sort_by_key(|(seq, _)| *seq);

        Ok(rank_hits(
            scored.into_iter().map(|(_, hit)| hit).collect(),
            top_k,
        ))
    }

    /// `1 - distance / 2`, mapping cosine distance onto `[0, 1]`.
    fn distance_to_score(&self, distance: f32) -> f32 {
        (1.0 - distance / 2.0).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmindex_core::MetadataValue;

    async fn setup() -> (MemoryStore, Collection) {
        let store = MemoryStore::new();
        let collection = store
            .ensure_collection("voicemail_transcripts")
            .await
            .unwrap_or_else(|e| panic!("collection should be created: {e}"));
        (store, collection)
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let (store, first) = setup().await;
        store
            .upsert(&first, "a", &[1.0, 0.0], "doc", &Metadata::new())
            .await
            .unwrap_or_else(|e| panic!("upsert should succeed: {e}"));
        let second = store
            .ensure_collection("voicemail_transcripts")
            .await
            .unwrap_or_else(|e| panic!("collection should exist: {e}"));

        assert_eq!(first, second);
        assert_eq!(store.count("voicemail_transcripts"), 1);
    }

    #[tokio::test]
    async fn upsert_same_id_replaces() {
        let (store, collection) = setup().await;
        let mut metadata = Metadata::new();
        metadata.insert("version".to_string(), MetadataValue::Int(1));
        store
            .upsert(&collection, "vm-1", &[1.0, 0.0], "first", &metadata)
            .await
            .unwrap_or_else(|e| panic!("upsert should succeed: {e}"));
        metadata.insert("version".to_string(), MetadataValue::Int(2));
        store
            .upsert(&collection, "vm-1", &[0.0, 1.0], "second", &metadata)
            .await
            .unwrap_or_else(|e| panic!("upsert should succeed: {e}"));

        assert_eq!(store.count(&collection.name), 1);
        let (document, stored) = store
            .get(&collection.name, "vm-1")
            .unwrap_or_else(|| panic!("record should exist"));
        assert_eq!(document, "second");
        assert_eq!(stored.get("version"), Some(&MetadataValue::Int(2)));
    }

    #[tokio::test]
    async fn query_orders_by_distance_and_truncates() {
        let (store, collection) = setup().await;
        for (id, vector) in [
            ("far", [0.0_f32, 1.0]),
            ("near", [1.0, 0.1]),
            ("exact", [1.0, 0.0]),
        ] {
            store
                .upsert(&collection, id, &vector, id, &Metadata::new())
                .await
                .unwrap_or_else(|e| panic!("upsert should succeed: {e}"));
        }

        let hits = store
            .query(&collection, &[1.0, 0.0], 2)
            .await
            .unwrap_or_else(|e| panic!("query should succeed: {e}"));
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn ties_follow_first_insertion_order() {
        let (store, collection) = setup().await;
        for id in ["c", "a", "b"] {
            store
                .upsert(&collection, id, &[1.0, 1.0], id, &Metadata::new())
                .await
                .unwrap_or_else(|e| panic!("upsert should succeed: {e}"));
        }
        // Replacing "c" keeps its original slot.
        store
            .upsert(&collection, "c", &[1.0, 1.0], "c2", &Metadata::new())
            .await
            .unwrap_or_else(|e| panic!("upsert should succeed: {e}"));

        let hits = store
            .query(&collection, &[1.0, 1.0], 10)
            .await
            .unwrap_or_else(|e| panic!("query should succeed: {e}"));
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn dimension_mismatch_on_upsert_and_query() {
        let (store, collection) = setup().await;
        store
            .upsert(&collection, "a", &[1.0, 0.0, 0.0], "a", &Metadata::new())
            .await
            .unwrap_or_else(|e| panic!("upsert should succeed: {e}"));

        let err = store
            .upsert(&collection, "b", &[1.0, 0.0], "b", &Metadata::new())
            .await;
        assert_eq!(
            err,
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        );
        assert!(matches!(
            store.query(&collection, &[1.0], 1).await,
            Err(Error::DimensionMismatch { .. })
        ));
        assert_eq!(store.dimensions(&collection.name), Some(3));
        assert_eq!(store.count(&collection.name), 1);
    }

    #[tokio::test]
    async fn find_collection_never_creates() {
        let store = MemoryStore::new();
        let missing = store
            .find_collection("voicemail_transcripts")
            .await
            .unwrap_or_else(|e| panic!("lookup should succeed: {e}"));
        assert_eq!(missing, None);

        let created = store
            .ensure_collection("voicemail_transcripts")
            .await
            .unwrap_or_else(|e| panic!("collection should be created: {e}"));
        let found = store
            .find_collection("voicemail_transcripts")
            .await
            .unwrap_or_else(|e| panic!("lookup should succeed: {e}"));
        assert_eq!(found, Some(created));
        assert_eq!(
            store
                .find_collection("ghost")
                .await
                .unwrap_or_else(|e| panic!("lookup should succeed: {e}")),
            None
        );
    }

    #[tokio::test]
    async fn unknown_collection_is_unavailable() {
        let store = MemoryStore::new();
        let ghost = Collection {
            name: "ghost".to_string(),
            id: "ghost".to_string(),
        };
        assert!(matches!(
            store.query(&ghost, &[1.0], 1).await,
            Err(Error::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn empty_collection_query_is_empty() {
        let (store, collection) = setup().await;
        let hits = store
            .query(&collection, &[1.0, 0.0], 5)
            .await
            .unwrap_or_else(|e| panic!("query should succeed: {e}"));
        assert!(hits.is_empty());
    }

    #[test]
    fn score_is_monotonic_in_distance() {
        let store = MemoryStore::new();
        assert!((store.distance_to_score(0.0) - 1.0).abs() < f32::EPSILON);
        assert!(store.distance_to_score(0.5) > store.distance_to_score(1.0));
        assert!(store.distance_to_score(2.0).abs() < f32::EPSILON);
    }
}
