//! Vector index over guideline chunks
//!
//! This module provides:
//! - A backend trait with an embedded SQLite implementation and Qdrant
//! - Idempotent upsert keyed by chunk id (known ids are never re-embedded)
//! - Top-k retrieval that reports unavailability instead of failing

mod payload;
mod qdrant;
mod sqlite;

pub use payload::*;
pub use qdrant::*;
pub use sqlite::*;

use crate::chunk::GuidelineChunk;
use crate::config::{Config, IndexBackendKind};
use crate::embed::{embed_in_batches, Embedder};
use crate::error::{Error, Result, Unavailable};
use crate::progress::{advance_progress, finish_progress, start_progress_bar};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// A stored chunk with its embedding
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub chunk: GuidelineChunk,
}

/// A retrieved chunk and its similarity to the query
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: GuidelineChunk,
    pub score: f32,
}

/// Storage for one named collection
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Human-readable backend and location
    fn describe(&self) -> String;

    async fn collection_exists(&self) -> Result<bool>;

    /// Create the collection, or verify an existing one has `dimension`
    async fn ensure_collection(&self, dimension: usize) -> Result<()>;

    /// Drop the collection and all its records; false if it did not exist
    async fn delete_collection(&self) -> Result<bool>;

    /// Subset of `ids` already stored
    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>>;

    /// Insert or overwrite records by id
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Nearest records by cosine similarity, best first
    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>>;

    async fn count(&self) -> Result<usize>;
}

/// Open the configured backend for the configured collection
pub fn open_backend(config: &Config) -> Result<Box<dyn VectorBackend>> {
    let collection = &config.rag.collection_name;
    match config.index.backend {
        IndexBackendKind::Sqlite => Ok(Box::new(SqliteBackend::new(
            &config.index_db_file(),
            collection,
        ))),
        IndexBackendKind::Qdrant => Ok(Box::new(QdrantBackend::new(
            &config.index.qdrant_url,
            collection,
        )?)),
    }
}

/// Backend that could not be opened; every call reports the cause
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(cause: impl std::fmt::Display) -> Self {
        Self {
            reason: cause.to_string(),
        }
    }

    fn fail<T>(&self) -> Result<T> {
        Err(Error::IndexUnavailable(self.reason.clone()))
    }
}

#[async_trait]
impl VectorBackend for UnavailableBackend {
    fn describe(&self) -> String {
        format!("unavailable ({})", self.reason)
    }

    async fn collection_exists(&self) -> Result<bool> {
        self.fail()
    }

    async fn ensure_collection(&self, _dimension: usize) -> Result<()> {
        self.fail()
    }

    async fn delete_collection(&self) -> Result<bool> {
        self.fail()
    }

    async fn existing_ids(&self, _ids: &[String]) -> Result<HashSet<String>> {
        self.fail()
    }

    async fn upsert(&self, _records: Vec<VectorRecord>) -> Result<()> {
        self.fail()
    }

    async fn search(&self, _vector: &[f32], _limit: usize) -> Result<Vec<ScoredChunk>> {
        self.fail()
    }

    async fn count(&self) -> Result<usize> {
        self.fail()
    }
}

/// Embedding-aware index: chunks in, ranked chunks out
pub struct VectorIndex {
    backend: Box<dyn VectorBackend>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl VectorIndex {
    pub fn new(backend: Box<dyn VectorBackend>, embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self {
            backend,
            embedder,
            batch_size: batch_size.max(1),
        }
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub async fn exists(&self) -> Result<bool> {
        self.backend.collection_exists().await
    }

    pub async fn count(&self) -> Result<usize> {
        self.backend.count().await
    }

    /// Delete every record in the collection
    pub async fn wipe(&self) -> Result<bool> {
        self.backend.delete_collection().await
    }

    /// Store chunks whose ids are not yet indexed; returns how many were new
    pub async fn upsert(&self, chunks: &[GuidelineChunk]) -> Result<usize> {
        let mut seen = HashSet::new();
        let unique: Vec<&GuidelineChunk> = chunks
            .iter()
            .filter(|c| seen.insert(c.id.as_str()))
            .collect();

        if unique.is_empty() {
            return Ok(0);
        }

        self.embedder.check_ready()?;
        self.backend
            .ensure_collection(self.embedder.dimension())
            .await?;

        let ids: Vec<String> = unique.iter().map(|c| c.id.clone()).collect();
        let existing = self.backend.existing_ids(&ids).await?;
        let fresh: Vec<&GuidelineChunk> = unique
            .into_iter()
            .filter(|c| !existing.contains(&c.id))
            .collect();

        debug!(
            "{} chunks already indexed, {} to embed",
            existing.len(),
            fresh.len()
        );

        if fresh.is_empty() {
            return Ok(0);
        }

        let pb = start_progress_bar(fresh.len(), "Embedding chunks");
        for batch in fresh.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = embed_in_batches(self.embedder.as_ref(), texts, self.batch_size).await?;

            let records: Vec<VectorRecord> = batch
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| VectorRecord {
                    id: chunk.id.clone(),
                    embedding,
                    chunk: (*chunk).clone(),
                })
                .collect();
            self.backend.upsert(records).await?;

            for _ in batch {
                advance_progress(&pb);
            }
        }
        finish_progress(pb, "Embedding complete");

        info!("Indexed {} new chunks", fresh.len());
        Ok(fresh.len())
    }

    /// Top-k chunks for `text`, or the reason none could be retrieved
    pub async fn query(&self, text: &str, k: usize) -> std::result::Result<Vec<ScoredChunk>, Unavailable> {
        let exists = self
            .backend
            .collection_exists()
            .await
            .map_err(|e| Unavailable::Index(e.to_string()))?;
        if !exists {
            return Err(Unavailable::IndexMissing);
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        self.embedder
            .check_ready()
            .map_err(|e| Unavailable::Embedding(e.to_string()))?;
        let vector = self
            .embedder
            .embed(vec![text.to_string()])
            .await
            .map_err(|e| Unavailable::Embedding(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| Unavailable::Embedding("no embedding returned".to_string()))?;

        self.backend
            .search(&vector, k)
            .await
            .map_err(|e| Unavailable::Index(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::embed::testing::KeywordEmbedder;
    use crate::embed::HttpEmbedder;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn index_in(dir: &TempDir) -> VectorIndex {
        let backend = SqliteBackend::new(&dir.path().join("index.db"), "guidelines");
        VectorIndex::new(Box::new(backend), Arc::new(KeywordEmbedder::nutrition()), 2)
    }

    fn corpus() -> Vec<GuidelineChunk> {
        vec![
            GuidelineChunk::new("feeding.md", None, "Exclusive breastfeed for six months"),
            GuidelineChunk::new("feeding.md", None, "Offer iron rich foods and finger foods"),
            GuidelineChunk::new("hygiene.md", None, "Wash hands before preparing food"),
        ]
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir);

        assert_eq!(index.upsert(&corpus()).await.unwrap(), 3);
        assert_eq!(index.upsert(&corpus()).await.unwrap(), 0);
        assert_eq!(index.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_upsert_counts_duplicates_once() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir);

        let mut chunks = corpus();
        chunks.push(chunks[0].clone());
        assert_eq!(index.upsert(&chunks).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir);
        index.upsert(&corpus()).await.unwrap();

        let hits = index.query("how to wash hands", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.source_path, "hygiene.md");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_query_without_index_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir);

        assert_eq!(
            index.query("iron", 3).await.unwrap_err(),
            Unavailable::IndexMissing
        );
        assert!(!index.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_wipe_removes_collection() {
        let dir = TempDir::new().unwrap();
        let index = index_in(&dir);
        index.upsert(&corpus()).await.unwrap();

        assert!(index.wipe().await.unwrap());
        assert!(!index.exists().await.unwrap());
        assert_eq!(index.upsert(&corpus()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_slow_embedding_service_is_unavailable_within_timeout() {
        let dir = TempDir::new().unwrap();
        index_in(&dir).upsert(&corpus()).await.unwrap();

        let vectors = vec![vec![1.0_f32; 7]];
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "embeddings": vectors }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = EmbeddingConfig {
            backend_url: server.uri(),
            model: "custom-model".to_string(),
            dimension: 7,
            ..EmbeddingConfig::default()
        };
        let embedder = HttpEmbedder::new(&config, Duration::from_secs(1)).unwrap();
        let backend = SqliteBackend::new(&dir.path().join("index.db"), "guidelines");
        let index = VectorIndex::new(Box::new(backend), Arc::new(embedder), 2);

        let started = Instant::now();
        let reason = index.query("iron", 2).await.unwrap_err();
        assert!(matches!(reason, Unavailable::Embedding(_)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_unavailable_backend_reports_cause() {
        let index = VectorIndex::new(
            Box::new(UnavailableBackend::new("invalid qdrant url")),
            Arc::new(KeywordEmbedder::nutrition()),
            2,
        );

        assert_eq!(index.describe(), "unavailable (invalid qdrant url)");
        assert!(matches!(index.exists().await, Err(Error::IndexUnavailable(_))));
        assert_eq!(
            index.query("iron", 2).await.unwrap_err(),
            Unavailable::Index("Guideline index unavailable: invalid qdrant url".to_string())
        );
    }
}
