use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};
use vmindex_extract::ExtractionConfig;

pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";
pub const CHROMA_HOST_ENV: &str = "CHROMA_HOST";
pub const COLLECTION_ENV: &str = "VMINDEX_COLLECTION";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// Overrides the built-in extraction rules when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "EmbeddingConfig::default_host")]
    pub host: String,
    #[serde(default = "EmbeddingConfig::default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Expected vector length; learned from the first response when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            model: Self::default_model(),
            timeout_secs: default_timeout_secs(),
            dimensions: None,
        }
    }
}

impl EmbeddingConfig {
    fn default_host() -> String {
        "http://localhost:11434".to_string()
    }

    fn default_model() -> String {
        "nomic-embed-text".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Chroma,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chroma" => Ok(Self::Chroma),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{other}' (chroma|memory)")),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chroma => write!(f, "chroma"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Chroma REST API generation. Servers from 1.0 on only serve v2.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChromaApiVersion {
    V1,
    #[default]
    V2,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "StoreConfig::default_url")]
    pub url: String,
    #[serde(default = "StoreConfig::default_collection")]
    pub collection: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub api_version: ChromaApiVersion,
    /// v2 only.
    #[serde(default = "StoreConfig::default_tenant")]
    pub tenant: String,
    /// v2 only.
    #[serde(default = "StoreConfig::default_database")]
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: Self::default_url(),
            collection: Self::default_collection(),
            timeout_secs: default_timeout_secs(),
            api_version: ChromaApiVersion::default(),
            tenant: Self::default_tenant(),
            database: Self::default_database(),
        }
    }
}

impl StoreConfig {
    fn default_url() -> String {
        "http://localhost:8000".to_string()
    }

    fn default_collection() -> String {
        "voicemail_transcripts".to_string()
    }

    fn default_tenant() -> String {
        "default_tenant".to_string()
    }

    fn default_database() -> String {
        "default_database".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineSettings {
    #[serde(default = "PipelineSettings::default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "PipelineSettings::default_retry_delays_ms")]
    pub retry_delays_ms: Vec<u64>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            concurrency: Self::default_concurrency(),
            call_timeout_secs: default_timeout_secs(),
            retry_delays_ms: Self::default_retry_delays_ms(),
        }
    }
}

impl PipelineSettings {
    const fn default_concurrency() -> usize {
        4
    }

    fn default_retry_delays_ms() -> Vec<u64> {
        vec![250, 1000]
    }
}

/// Written by `vmindex init`.
const CONFIG_TEMPLATE: &str = r#"{
  "embedding": {
    "host": "http://localhost:11434",
    "model": "nomic-embed-text",
    "timeout_secs": 30
  },
  "store": {
    "backend": "chroma",
    "url": "http://localhost:8000",
    "collection": "voicemail_transcripts",
    "timeout_secs": 30,
    "api_version": "v2",
    "tenant": "default_tenant",
    "database": "default_database"
  },
  "pipeline": {
    "concurrency": 4,
    "call_timeout_secs": 30,
    "retry_delays_ms": [250, 1000]
  }
}"#;

const fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load `~/vmindex/config.json`, then apply environment overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join("config.json");
        let mut config = Self::from_path(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_path(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Invalid config file {}: {e}", config_path.display())
        })?;
        info!("Loaded config from {}", config_path.display());

        Ok(config)
    }

    /// Override endpoints and collection from the environment. Empty values
    /// are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = lookup(OLLAMA_HOST_ENV) {
            debug!("{OLLAMA_HOST_ENV} overrides embedding host");
            self.embedding.host = host;
        }
        if let Some(url) = lookup(CHROMA_HOST_ENV) {
            debug!("{CHROMA_HOST_ENV} overrides store url");
            self.store.url = url;
        }
        if let Some(collection) = lookup(COLLECTION_ENV) {
            debug!("{COLLECTION_ENV} overrides collection");
            self.store.collection = collection;
        }
    }

    fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("vmindex"))
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, CONFIG_TEMPLATE)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Start Ollama and pull the model: ollama pull nomic-embed-text");
        println!("   2. Start ChromaDB at the configured url (or set store.backend to \"memory\")");
        println!("   3. Run 'vmindex ingest' to index the sample voicemails");
        println!();
        println!("🔧 Configuration options:");
        println!("   - {OLLAMA_HOST_ENV} / {CHROMA_HOST_ENV}: override the endpoints");
        println!("   - pipeline.concurrency: records processed at once");
        println!("   - extraction: custom name/company rules and phone pattern");
        println!();
        Ok(config_path)
    }
}
