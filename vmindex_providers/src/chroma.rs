//! Chroma REST adapter.
//!
//! Targets the v2 API (tenant/database scoped) by default; v1 is kept for
//! servers older than Chroma 1.0. Distances are whatever the collection's
//! space yields (squared L2 by default); scores use the trait's
//! `1 / (1 + distance)` mapping.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use vmindex_core::{Collection, Error, Metadata, QueryHit, RecordStore, Result, rank_hits};

pub const DEFAULT_TENANT: &str = "default_tenant";
pub const DEFAULT_DATABASE: &str = "default_database";

/// REST API flavour spoken by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChromaApi {
    /// `/api/v1/collections`, Chroma before 1.0.
    V1,
    /// `/api/v2/tenants/{tenant}/databases/{database}/collections`.
    V2 { tenant: String, database: String },
}

impl Default for ChromaApi {
    fn default() -> Self {
        Self::V2 {
            tenant: DEFAULT_TENANT.to_string(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

pub struct ChromaStore {
    client: Client,
    url: String,
    api: ChromaApi,
    // collection id -> dimensionality seen by this client
    dimensions: Mutex<HashMap<String, usize>>,
}

impl ChromaStore {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::StoreUnavailable(format!("failed to build HTTP client: {e}")))?;
        let url = url.trim_end_matches('/').to_string();

        info!("Creating ChromaStore: {url}");
        Ok(Self {
            client,
            url,
            api: ChromaApi::default(),
            dimensions: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn with_api(mut self, api: ChromaApi) -> Self {
        debug!("Chroma API: {api:?}");
        self.api = api;
        self
    }

    fn collections_url(&self) -> String {
        match &self.api {
            ChromaApi::V1 => format!("{}/api/v1/collections", self.url),
            ChromaApi::V2 { tenant, database } => format!(
                "{}/api/v2/tenants/{tenant}/databases/{database}/collections",
                self.url
            ),
        }
    }

    /// `key` is the collection name for lookups and its id for writes and
    /// queries; `action` is empty or a sub-path such as `/upsert`.
    fn collection_url(&self, key: &str, action: &str) -> String {
        format!("{}/{key}{action}", self.collections_url())
    }

    fn known_dimensions(&self, collection: &Collection) -> Option<usize> {
        self.dimensions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&collection.id)
            .copied()
    }

    fn check_dimensions(&self, collection: &Collection, actual: usize) -> Result<()> {
        match self.known_dimensions(collection) {
            Some(expected) if expected != actual => {
                Err(Error::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    fn remember_dimensions(&self, collection: &Collection, dimensions: usize) {
        self.dimensions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.id.clone())
            .or_insert(dimensions);
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String)> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
        Ok((status, body))
    }

    async fn post(&self, url: String, body: &serde_json::Value) -> Result<(StatusCode, String)> {
        self.send(self.client.post(url).json(body)).await
    }

    /// Map a non-2xx response onto the error taxonomy.
    fn check_status(
        &self,
        (status, body): (StatusCode, String),
        collection: Option<&Collection>,
        actual: usize,
    ) -> Result<String> {
        if status.is_success() {
            return Ok(body);
        }
        if body.to_lowercase().contains("dimension") {
            let known = collection.and_then(|c| self.known_dimensions(c));
            return Err(dimension_error(&body, known, actual));
        }
        Err(Error::StoreUnavailable(format!(
            "chroma request failed ({status}): {body}"
        )))
    }
}

/// Chroma reports a missing collection as 404 on v2 and as an error
/// message on v1.
fn is_missing_collection(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::NOT_FOUND {
        return true;
    }
    let body = body.to_lowercase();
    !status.is_success() && (body.contains("does not exist") || body.contains("not found"))
}

fn parse_collection(body: &str) -> Result<Collection> {
    let parsed: CollectionResponse = serde_json::from_str(body)
        .map_err(|e| Error::StoreUnavailable(format!("invalid collection response: {e}")))?;
    Ok(Collection {
        name: parsed.name,
        id: parsed.id,
    })
}

/// Build a `DimensionMismatch` from a Chroma error body such as
/// "Embedding dimension 3 does not match collection dimensionality 4".
fn dimension_error(body: &str, known: Option<usize>, actual: usize) -> Error {
    let numbers: Vec<usize> = body
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|s| s.parse().ok())
        .collect();
    let expected = match (known, numbers.as_slice()) {
        (Some(expected), _) => expected,
        (None, [got, expected]) if *got == actual => *expected,
        _ => 0,
    };
    Error::DimensionMismatch { expected, actual }
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
    name: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    ids: [&'a str; 1],
    embeddings: [&'a [f32]; 1],
    documents: [&'a str; 1],
    metadatas: [&'a Metadata; 1],
}

fn first_row<T>(rows: Option<Vec<Vec<T>>>) -> Option<Vec<T>> {
    rows.and_then(|rows| rows.into_iter().next())
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

impl QueryResponse {
    /// Flatten the single-query batch into hits.
    fn into_hits(self) -> Result<Vec<QueryHit>> {
        let Some(ids) = self.ids.into_iter().next() else {
            return Ok(Vec::new());
        };
        let documents = first_row(self.documents).unwrap_or_default();
        let metadatas = first_row(self.metadatas).unwrap_or_default();
        let distances = first_row(self.distances).unwrap_or_default();

        if distances.len() != ids.len() {
            return Err(Error::StoreUnavailable(format!(
                "chroma returned {} distances for {} ids",
                distances.len(),
                ids.len()
            )));
        }

        let mut documents = documents.into_iter();
        let mut metadatas = metadatas.into_iter();
        Ok(ids
            .into_iter()
            .zip(distances)
            .map(|(id, distance)| QueryHit {
                id,
                document: documents.next().flatten().unwrap_or_default(),
                metadata: metadatas.next().flatten().unwrap_or_default(),
                distance,
            })
            .collect())
    }
}

#[async_trait]
impl RecordStore for ChromaStore {
    async fn ensure_collection(&self, name: &str) -> Result<Collection> {
        let response = self
            .post(
                self.collections_url(),
                &json!({ "name": name, "get_or_create": true }),
            )
            .await?;
        let collection = parse_collection(&self.check_status(response, None, 0)?)?;

        info!("Using Chroma collection '{}' ({})", collection.name, collection.id);
        Ok(collection)
    }

    async fn find_collection(&self, name: &str) -> Result<Option<Collection>> {
        let (status, body) = self
            .send(self.client.get(self.collection_url(name, "")))
            .await?;
        if is_missing_collection(status, &body) {
            debug!("Chroma collection '{name}' does not exist");
            return Ok(None);
        }
        let body = self.check_status((status, body), None, 0)?;
        parse_collection(&body).map(Some)
    }

    async fn upsert(
        &self,
        collection: &Collection,
        id: &str,
        vector: &[f32],
        document: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        self.check_dimensions(collection, vector.len())?;

        let request = UpsertRequest {
            ids: [id],
            embeddings: [vector],
            documents: [document],
            metadatas: [metadata],
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| Error::StoreUnavailable(format!("failed to encode upsert: {e}")))?;
        let response = self
            .post(self.collection_url(&collection.id, "/upsert"), &body)
            .await?;
        self.check_status(response, Some(collection), vector.len())?;

        self.remember_dimensions(collection, vector.len());
        debug!("Upserted '{id}' into '{}'", collection.name);
        Ok(())
    }

    async fn query(
        &self,
        collection: &Collection,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<QueryHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimensions(collection, vector.len())?;

        let response = self
            .post(
                self.collection_url(&collection.id, "/query"),
                &json!({
                    "query_embeddings": [vector],
                    "n_results": top_k,
                    "include": ["documents", "metadatas", "distances"],
                }),
            )
            .await?;
        let body = self.check_status(response, Some(collection), vector.len())?;
        let parsed: QueryResponse = serde_json::from_str(&body)
            .map_err(|e| Error::StoreUnavailable(format!("invalid query response: {e}")))?;

        Ok(rank_hits(parsed.into_hits()?, top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmindex_core::MetadataValue;

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn query_response_flattens_first_batch() {
        let body = r#"{
            "ids": [["vm-001", "vm-004"]],
            "documents": [["partnership terms", null]],
            "metadatas": [[{"from_name": "Mark", "priority": 1}, null]],
            "distances": [[0.25, 0.75]],
            "embeddings": null
        }"#;
        let parsed: QueryResponse = serde_json::from_str(body).expect("valid body should parse");
        let hits = parsed.into_hits().expect("hits should flatten");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "vm-001");
        assert_eq!(hits[0].document, "partnership terms");
        assert_eq!(
            hits[0].metadata.get("from_name"),
            Some(&MetadataValue::Str("Mark".to_string()))
        );
        assert_eq!(hits[0].metadata.get("priority"), Some(&MetadataValue::Int(1)));
        assert_eq!(hits[1].document, "");
        assert!(hits[1].metadata.is_empty());
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn empty_query_response_has_no_hits() {
        let parsed: QueryResponse =
            serde_json::from_str(r#"{"ids": []}"#).expect("valid body should parse");
        assert!(parsed.into_hits().expect("hits should flatten").is_empty());
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn mismatched_distances_are_rejected() {
        let parsed: QueryResponse =
            serde_json::from_str(r#"{"ids": [["a", "b"]], "distances": [[0.1]]}"#)
                .expect("valid body should parse");
        assert!(matches!(
            parsed.into_hits(),
            Err(Error::StoreUnavailable(_))
        ));
    }

    #[test]
    fn dimension_error_reads_chroma_message() {
        let err = dimension_error(
            r#"{"error":"InvalidDimension","message":"Embedding dimension 3 does not match collection dimensionality 4"}"#,
            None,
            3,
        );
        assert_eq!(
            err,
            Error::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn dimension_error_prefers_known_dimensions() {
        let err = dimension_error("dimension mismatch", Some(768), 384);
        assert_eq!(
            err,
            Error::DimensionMismatch {
                expected: 768,
                actual: 384
            }
        );
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn upsert_request_wire_shape() {
        let mut metadata = Metadata::new();
        metadata.insert("phone".to_string(), "555-123-4567".into());
        let vector = [0.5_f32, 1.0];
        let request = UpsertRequest {
            ids: ["vm-001"],
            embeddings: [&vector],
            documents: ["text"],
            metadatas: [&metadata],
        };
        let value = serde_json::to_value(&request).expect("request should encode");
        assert_eq!(
            value,
            json!({
                "ids": ["vm-001"],
                "embeddings": [[0.5, 1.0]],
                "documents": ["text"],
                "metadatas": [{"phone": "555-123-4567"}],
            })
        );
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn client_side_dimension_tracking() {
        let store = ChromaStore::new("http://localhost:8000", Duration::from_secs(1))
            .expect("client should build");
        let collection = Collection {
            name: "voicemail_transcripts".to_string(),
            id: "c-1".to_string(),
        };
        assert!(store.check_dimensions(&collection, 3).is_ok());
        store.remember_dimensions(&collection, 3);
        assert!(store.check_dimensions(&collection, 3).is_ok());
        assert_eq!(
            store.check_dimensions(&collection, 5),
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 5
            })
        );
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn v2_urls_are_tenant_scoped() {
        let store = ChromaStore::new("http://localhost:8000/", Duration::from_secs(1))
            .expect("client should build");
        assert_eq!(
            store.collections_url(),
            "http://localhost:8000/api/v2/tenants/default_tenant/databases/default_database/collections"
        );
        assert_eq!(
            store.collection_url("c-1", "/upsert"),
            "http://localhost:8000/api/v2/tenants/default_tenant/databases/default_database/collections/c-1/upsert"
        );

        let store = store.with_api(ChromaApi::V2 {
            tenant: "acme".to_string(),
            database: "calls".to_string(),
        });
        assert_eq!(
            store.collection_url("c-1", "/query"),
            "http://localhost:8000/api/v2/tenants/acme/databases/calls/collections/c-1/query"
        );
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn v1_urls_are_unscoped() {
        let store = ChromaStore::new("http://chroma:8000", Duration::from_secs(1))
            .expect("client should build")
            .with_api(ChromaApi::V1);
        assert_eq!(store.collections_url(), "http://chroma:8000/api/v1/collections");
        assert_eq!(
            store.collection_url("voicemail_transcripts", ""),
            "http://chroma:8000/api/v1/collections/voicemail_transcripts"
        );
        assert_eq!(
            store.collection_url("c-1", "/query"),
            "http://chroma:8000/api/v1/collections/c-1/query"
        );
    }

    #[test]
    fn missing_collection_responses() {
        assert!(is_missing_collection(StatusCode::NOT_FOUND, ""));
        assert!(is_missing_collection(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"ValueError('Collection ghost does not exist.')"}"#
        ));
        assert!(!is_missing_collection(
            StatusCode::INTERNAL_SERVER_ERROR,
            "database is locked"
        ));
        assert!(!is_missing_collection(StatusCode::OK, "not found"));
    }

    #[test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    fn collection_response_parses() {
        let collection = parse_collection(
            r#"{"id": "7f3c", "name": "voicemail_transcripts", "metadata": null, "dimension": 768}"#,
        )
        .expect("valid body should parse");
        assert_eq!(collection.id, "7f3c");
        assert_eq!(collection.name, "voicemail_transcripts");
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Test failure should panic with context")]
    async fn unreachable_store_is_unavailable() {
        let store =
            ChromaStore::new("http://127.0.0.1:9", Duration::from_secs(2)).expect("client should build");
        assert!(matches!(
            store.ensure_collection("voicemail_transcripts").await,
            Err(Error::StoreUnavailable(_))
        ));
        assert!(matches!(
            store.find_collection("voicemail_transcripts").await,
            Err(Error::StoreUnavailable(_))
        ));
    }
}
