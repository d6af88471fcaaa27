//! Default values for configuration

use super::{EmbeddingProvider, IndexBackendKind};
use std::path::PathBuf;

fn env_or(name: &str, fallback: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Directory holding the monthly WHO reference tables
pub fn default_tables_dir() -> PathBuf {
    PathBuf::from(env_or("GROWTH_TABLES_DIR", "data/who"))
}

/// Directory of guideline documents to index
pub fn default_docs_dir() -> PathBuf {
    PathBuf::from(env_or("RAG_DOCS_DIR", "data/guidelines"))
}

/// Directory where the vector index is persisted
pub fn default_persist_dir() -> PathBuf {
    PathBuf::from(env_or("RAG_PERSIST_DIR", "data/index"))
}

/// Default collection name
pub fn default_collection_name() -> String {
    env_or("RAG_COLLECTION", "nutrition_guidelines")
}

/// Number of chunks retrieved per question
pub fn default_top_k() -> usize {
    std::env::var("RAG_TOP_K")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(4)
}

/// Build the index on first use when it is missing
pub fn default_auto_build() -> bool {
    std::env::var("RAG_AUTO_BUILD")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Characters per chunk
pub fn default_chunk_size() -> usize {
    1000
}

/// Characters shared by consecutive chunks
pub fn default_chunk_overlap() -> usize {
    150
}

pub fn default_index_backend() -> IndexBackendKind {
    IndexBackendKind::Sqlite
}

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    env_or("QDRANT_URL", "http://127.0.0.1:6334")
}

pub fn default_embedding_provider() -> EmbeddingProvider {
    EmbeddingProvider::Gemini
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    env_or("GEMINI_EMBEDDING_MODEL", "text-embedding-004")
}

/// Output dimension of text-embedding-004
pub fn default_embedding_dimension() -> usize {
    768
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default embedding sidecar URL
pub fn default_embedding_backend_url() -> String {
    env_or("EMBEDDING_BACKEND_URL", "http://127.0.0.1:7997")
}

/// Default generation model
pub fn default_generation_model() -> String {
    env_or("GEMINI_MODEL", "gemini-2.5-flash")
}

/// Environment variable holding the API key
pub fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

pub fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

pub fn default_temperature() -> f32 {
    0.4
}

pub fn default_max_output_tokens() -> u32 {
    700
}

/// Upper bound on any single call to the external service
pub fn default_timeout_secs() -> u64 {
    30
}

pub fn default_language() -> String {
    "en".to_string()
}
