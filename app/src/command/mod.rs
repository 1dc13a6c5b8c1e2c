//! Static strategy pattern for CLI commands.
//!
//! Each subcommand is its own strategy type with its own input, so `main`
//! dispatches without trait objects.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use vmindex_config::{ChromaApiVersion, Config, StoreBackend};
use vmindex_core::{Embedder, RecordStore};
use vmindex_extract::FieldExtractor;
use vmindex_pipeline::{PipelineConfig, RetryPolicy};
use vmindex_providers::{ChromaApi, ChromaStore, OllamaEmbedder};
use vmindex_store::MemoryStore;

mod ingest;
mod init;
mod search;
mod version;

pub use ingest::{IngestInput, IngestStrategy};
pub use init::InitStrategy;
pub use search::{SearchInput, SearchStrategy};
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Embedding and store clients built from configuration.
struct Backends {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn RecordStore>,
}

fn build_backends(config: &Config, store_override: Option<StoreBackend>) -> anyhow::Result<Backends> {
    let embedding = &config.embedding;
    let mut embedder = OllamaEmbedder::new(
        &embedding.host,
        embedding.model.clone(),
        Duration::from_secs(embedding.timeout_secs),
    )?;
    if let Some(dimensions) = embedding.dimensions {
        embedder = embedder.with_dimensions(dimensions);
    }
    info!(
        "Embedding with '{}' at {}",
        embedding.model, embedding.host
    );

    let backend = store_override.unwrap_or(config.store.backend);
    let store: Arc<dyn RecordStore> = match backend {
        StoreBackend::Chroma => {
            let api = chroma_api(config);
            info!("Using Chroma store at {} ({api:?})", config.store.url);
            Arc::new(
                ChromaStore::new(
                    &config.store.url,
                    Duration::from_secs(config.store.timeout_secs),
                )?
                .with_api(api),
            )
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; records last for this run only");
            Arc::new(MemoryStore::new())
        }
    };

    Ok(Backends {
        embedder: Arc::new(embedder),
        store,
    })
}

fn chroma_api(config: &Config) -> ChromaApi {
    match config.store.api_version {
        ChromaApiVersion::V1 => ChromaApi::V1,
        ChromaApiVersion::V2 => ChromaApi::V2 {
            tenant: config.store.tenant.clone(),
            database: config.store.database.clone(),
        },
    }
}

fn build_extractor(config: &Config) -> anyhow::Result<FieldExtractor> {
    let extractor = match &config.extraction {
        Some(extraction) => FieldExtractor::new(extraction)?,
        None => FieldExtractor::with_defaults()?,
    };
    info!("Loaded {} extraction rules", extractor.rule_count());
    Ok(extractor)
}

fn pipeline_config(config: &Config, collection: String) -> PipelineConfig {
    PipelineConfig {
        collection,
        concurrency: config.pipeline.concurrency,
        call_timeout: Duration::from_secs(config.pipeline.call_timeout_secs),
        retry: RetryPolicy::from_millis(&config.pipeline.retry_delays_ms),
    }
}
