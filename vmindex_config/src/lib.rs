mod schema;

pub use schema::{
    CHROMA_HOST_ENV, COLLECTION_ENV, ChromaApiVersion, Config, EmbeddingConfig, OLLAMA_HOST_ENV,
    PipelineSettings, StoreBackend, StoreConfig,
};
