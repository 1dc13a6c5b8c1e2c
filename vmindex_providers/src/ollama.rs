use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vmindex_core::{DimensionGuard, Embedder, Error, Result};

/// Embedding client for an Ollama server.
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    guard: DimensionGuard,
}

impl OllamaEmbedder {
    pub fn new(host: &str, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(Error::EmbeddingUnavailable(
                "missing embedding model name".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::EmbeddingUnavailable(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/api/embeddings", host.trim_end_matches('/'));

        info!("Creating OllamaEmbedder: endpoint={endpoint}, model={model}");
        Ok(Self {
            client,
            endpoint,
            model,
            guard: DimensionGuard::new(),
        })
    }

    /// Fix the expected vector length instead of learning it from the first
    /// response.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.guard = DimensionGuard::fixed(dimensions);
        self
    }

    #[must_use]
    pub fn dimensions(&self) -> Option<usize> {
        self.guard.dimensions()
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
    #[serde(default)]
    error: Option<String>,
}

/// Decode a 2xx body. A provider-reported model error is an availability
/// problem; anything that does not decode to a vector is malformed.
fn parse_embedding(body: &str) -> Result<Vec<f32>> {
    let response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| Error::EmbeddingMalformed(format!("invalid embedding response: {e}")))?;
    if let Some(err) = response.error {
        return Err(Error::EmbeddingUnavailable(format!("model error: {err}")));
    }
    Ok(response.embedding)
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedding request failed ({status}): {body}"
            )));
        }

        let embedding = parse_embedding(&body)?;
        self.guard.check(&embedding)?;
        debug!("Embedded {} chars into {} dimensions", text.len(), embedding.len());
        Ok(embedding)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
