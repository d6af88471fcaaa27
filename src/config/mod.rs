//! Configuration management for growthwise
//!
//! Handles loading, saving, and validating configuration from TOML files.
//! The API credential itself is never written to disk; only the name of the
//! environment variable that holds it.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// WHO reference tables
    #[serde(default)]
    pub growth: GrowthConfig,

    /// Guideline corpus and retrieval settings
    #[serde(default)]
    pub rag: RagConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Vector index backend
    #[serde(default)]
    pub index: IndexConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Text generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthConfig {
    /// Directory containing `height-for-age/`, `weight-for-age/` and `weight-for-height/`
    #[serde(default = "default_tables_dir")]
    pub tables_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Guideline documents (.txt, .md, .pdf, .docx)
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,

    /// Where the SQLite index lives
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,

    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Build the index during a recommendation when none exists
    #[serde(default = "default_auto_build")]
    pub auto_build: bool,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Characters per chunk window
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive windows
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackendKind {
    Sqlite,
    Qdrant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_backend")]
    pub backend: IndexBackendKind,

    /// Qdrant connection URL, used when `backend = "qdrant"`
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Generative Language API `batchEmbedContents`
    Gemini,
    /// Embedding sidecar speaking `POST /v1/embed/text`
    Http,
    /// In-process fastembed model (requires the `local-embed` feature)
    Local,
}

impl std::fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingProvider::Gemini => write!(f, "gemini"),
            EmbeddingProvider::Http => write!(f, "http"),
            EmbeddingProvider::Local => write!(f, "local"),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProvider,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,

    /// Sidecar URL for the `http` provider
    #[serde(default = "default_embedding_backend_url")]
    pub backend_url: String,
}

/// Lookup the expected embedding dimension for a known model
pub fn embedding_dimension_for_model(model: &str) -> Option<usize> {
    match model {
        "text-embedding-004" | "models/text-embedding-004" => Some(768),
        "BAAI/bge-small-en-v1.5" => Some(384),
        "BAAI/bge-base-en-v1.5" => Some(768),
        "sentence-transformers/all-MiniLM-L6-v2" => Some(384),
        "intfloat/multilingual-e5-small" => Some(384),
        _ => None,
    }
}

impl EmbeddingConfig {
    /// Resolve the effective embedding dimension based on the configured model
    pub fn resolved_dimension(&self) -> usize {
        if let Some(expected) = embedding_dimension_for_model(&self.model) {
            if expected != self.dimension {
                warn!(
                    "Embedding dimension {} does not match model '{}' ({}); using {}",
                    self.dimension, self.model, expected, expected
                );
            }
            expected
        } else {
            self.dimension
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Bound on each call to the generation or embedding service
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Language used when a request does not name one
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for growthwise data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            growth: GrowthConfig::default(),
            rag: RagConfig::default(),
            chunk: ChunkConfig::default(),
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            tables_dir: default_tables_dir(),
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            persist_dir: default_persist_dir(),
            collection_name: default_collection_name(),
            top_k: default_top_k(),
            auto_build: default_auto_build(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            qdrant_url: default_qdrant_url(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
            backend_url: default_embedding_backend_url(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            api_key_env: default_api_key_env(),
            api_base_url: default_api_base_url(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
            default_language: default_language(),
        }
    }
}

impl Config {
    /// Get the default base directory for growthwise (~/.growthwise)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".growthwise")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Path of the SQLite index file for the sqlite backend
    pub fn index_db_file(&self) -> PathBuf {
        self.rag.persist_dir.join("index.db")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.chunk_size == 0 {
            return Err(Error::Config("chunk.chunk_size must be positive".to_string()));
        }

        if self.chunk.chunk_overlap >= self.chunk.chunk_size {
            return Err(Error::Config(
                "chunk.chunk_overlap must be < chunk.chunk_size".to_string(),
            ));
        }

        if self.rag.top_k == 0 {
            return Err(Error::Config("rag.top_k must be positive".to_string()));
        }

        if self.rag.collection_name.trim().is_empty() {
            return Err(Error::Config("rag.collection_name must not be empty".to_string()));
        }

        if self.generation.timeout_secs == 0 {
            return Err(Error::Config(
                "generation.timeout_secs must be positive".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(Error::Config(
                "embedding.dimension must be positive".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(Error::Config(
                "embedding.batch_size must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunk.chunk_size, 1000);
        assert_eq!(config.chunk.chunk_overlap, 150);
        assert_eq!(config.generation.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.generation.timeout_secs, 30);
        assert_eq!(config.generation.max_output_tokens, 700);
        assert_eq!(config.index.backend, IndexBackendKind::Sqlite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.rag.collection_name = "test_collection".to_string();
        config.index.backend = IndexBackendKind::Qdrant;

        config.save().unwrap();
        assert!(config.paths.config_file.exists());

        let saved = std::fs::read_to_string(&config.paths.config_file).unwrap();
        assert!(!saved.contains("api_key ="));

        let loaded = Config::load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(loaded.rag.collection_name, "test_collection");
        assert_eq!(loaded.index.backend, IndexBackendKind::Qdrant);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[rag]\ntop_k = 6\n\n[embedding]\nprovider = \"http\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.rag.top_k, 6);
        assert_eq!(config.embedding.provider, EmbeddingProvider::Http);
        assert_eq!(config.chunk.chunk_size, 1000);
        assert_eq!(config.paths.base_dir, tmp.path());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.chunk.chunk_overlap = config.chunk.chunk_size;
        assert!(config.validate().is_err());

        config.chunk.chunk_overlap = 100;
        assert!(config.validate().is_ok());

        config.rag.top_k = 0;
        assert!(config.validate().is_err());
        config.rag.top_k = 4;

        config.generation.timeout_secs = 0;
        assert!(config.validate().is_err());
        config.generation.timeout_secs = 30;

        config.embedding.dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let result = Config::load(&tmp.path().join("missing.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_known_model_dimensions() {
        assert_eq!(embedding_dimension_for_model("text-embedding-004"), Some(768));
        assert_eq!(embedding_dimension_for_model("BAAI/bge-small-en-v1.5"), Some(384));
        assert_eq!(embedding_dimension_for_model("unknown-model"), None);
    }

    #[test]
    fn test_resolved_dimension_matches_model() {
        let mut config = Config::default();
        config.embedding.model = "BAAI/bge-small-en-v1.5".to_string();
        config.embedding.dimension = 768;
        assert_eq!(config.embedding.resolved_dimension(), 384);

        config.embedding.model = "custom-model".to_string();
        config.embedding.dimension = 512;
        assert_eq!(config.embedding.resolved_dimension(), 512);
    }
}
