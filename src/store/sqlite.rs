//! Embedded SQLite vector backend
//!
//! Embeddings are stored as little-endian f32 blobs and scored with cosine
//! similarity in process. The database file is created on the first write;
//! read-only calls against a missing file report an empty index instead.

use super::{ScoredChunk, VectorBackend, VectorRecord};
use crate::chunk::GuidelineChunk;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// SQL schema for the index database
pub const SCHEMA_SQL: &str = r#"
-- Collections: one per configured collection name
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    dimension INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Records: chunk text, provenance and embedding
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL REFERENCES collections(name),
    id TEXT NOT NULL,
    text TEXT NOT NULL,
    source_path TEXT NOT NULL,
    page INTEGER,
    embedding BLOB NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_records_source ON records(collection, source_path);
"#;

/// Bound parameters per `IN (...)` lookup
const ID_LOOKUP_BATCH: usize = 500;

type RecordRow = (String, String, String, Option<i64>, Vec<u8>);

pub struct SqliteBackend {
    db_path: PathBuf,
    collection: String,
    pool: OnceCell<SqlitePool>,
}

impl SqliteBackend {
    pub fn new(db_path: &Path, collection: &str) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
            collection: collection.to_string(),
            pool: OnceCell::new(),
        }
    }

    /// Open (creating if needed) the database and its schema
    async fn pool(&self) -> Result<&SqlitePool> {
        self.pool
            .get_or_try_init(|| async {
                if let Some(parent) = self.db_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                let options = SqliteConnectOptions::new()
                    .filename(&self.db_path)
                    .create_if_missing(true)
                    .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                    .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

                debug!("Connecting to SQLite index at {:?}", self.db_path);

                let pool = SqlitePoolOptions::new()
                    .max_connections(5)
                    .connect_with(options)
                    .await?;
                sqlx::query(SCHEMA_SQL).execute(&pool).await?;
                Ok::<_, Error>(pool)
            })
            .await
    }

    /// Pool for read paths; `None` when no database file has been written yet
    async fn existing_pool(&self) -> Result<Option<&SqlitePool>> {
        if self.pool.initialized() || self.db_path.exists() {
            Ok(Some(self.pool().await?))
        } else {
            Ok(None)
        }
    }

    async fn stored_dimension(&self, pool: &SqlitePool) -> Result<Option<usize>> {
        let dimension: Option<i64> =
            sqlx::query_scalar("SELECT dimension FROM collections WHERE name = ?")
                .bind(&self.collection)
                .fetch_optional(pool)
                .await?;
        Ok(dimension.map(|d| d as usize))
    }
}

#[async_trait]
impl VectorBackend for SqliteBackend {
    fn describe(&self) -> String {
        format!("sqlite ({})", self.db_path.display())
    }

    async fn collection_exists(&self) -> Result<bool> {
        match self.existing_pool().await? {
            Some(pool) => Ok(self.stored_dimension(pool).await?.is_some()),
            None => Ok(false),
        }
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let pool = self.pool().await?;

        match self.stored_dimension(pool).await? {
            Some(stored) if stored == dimension => Ok(()),
            Some(stored) => Err(Error::Config(format!(
                "Collection '{}' stores vectors of size {}, but the embedding model produces {}. Rebuild the index or choose a new collection name.",
                self.collection, stored, dimension
            ))),
            None => {
                info!(
                    "Creating collection {} with dimension {}",
                    self.collection, dimension
                );
                sqlx::query("INSERT INTO collections (name, dimension, created_at) VALUES (?, ?, ?)")
                    .bind(&self.collection)
                    .bind(dimension as i64)
                    .bind(Utc::now().to_rfc3339())
                    .execute(pool)
                    .await?;
                Ok(())
            }
        }
    }

    async fn delete_collection(&self) -> Result<bool> {
        let Some(pool) = self.existing_pool().await? else {
            return Ok(false);
        };

        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM records WHERE collection = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if removed > 0 {
            info!("Deleted collection {}", self.collection);
        }
        Ok(removed > 0)
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        let mut found = HashSet::new();
        let Some(pool) = self.existing_pool().await? else {
            return Ok(found);
        };

        for batch in ids.chunks(ID_LOOKUP_BATCH) {
            let placeholders = batch.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let query = format!(
                "SELECT id FROM records WHERE collection = ? AND id IN ({})",
                placeholders
            );

            let mut query_builder = sqlx::query_scalar::<_, String>(&query).bind(&self.collection);
            for id in batch {
                query_builder = query_builder.bind(id);
            }
            found.extend(query_builder.fetch_all(pool).await?);
        }

        Ok(found)
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        debug!(
            "Upserting {} records to collection {}",
            records.len(),
            self.collection
        );

        let pool = self.pool().await?;
        let mut tx = pool.begin().await?;
        for record in records {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO records (collection, id, text, source_path, page, embedding)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&self.collection)
            .bind(&record.id)
            .bind(&record.chunk.text)
            .bind(&record.chunk.source_path)
            .bind(record.chunk.page.map(i64::from))
            .bind(encode_embedding(&record.embedding))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        let Some(pool) = self.existing_pool().await? else {
            return Ok(Vec::new());
        };

        if let Some(stored) = self.stored_dimension(pool).await? {
            if stored != vector.len() {
                return Err(Error::Embedding(format!(
                    "query vector has size {}, collection '{}' stores {}",
                    vector.len(),
                    self.collection,
                    stored
                )));
            }
        }

        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT id, text, source_path, page, embedding FROM records WHERE collection = ?",
        )
        .bind(&self.collection)
        .fetch_all(pool)
        .await?;

        debug!(
            "Scoring {} records in collection {}",
            rows.len(),
            self.collection
        );

        let mut scored: Vec<ScoredChunk> = rows
            .into_iter()
            .map(|(id, text, source_path, page, blob)| ScoredChunk {
                score: cosine_similarity(vector, &decode_embedding(&blob)),
                chunk: GuidelineChunk {
                    id,
                    text,
                    source_path,
                    page: page.map(|p| p as u32),
                },
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize> {
        let Some(pool) = self.existing_pool().await? else {
            return Ok(0);
        };

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(pool)
            .await?;
        Ok(count as usize)
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity; zero when either vector has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(source: &str, text: &str, embedding: Vec<f32>) -> VectorRecord {
        let chunk = GuidelineChunk::new(source, None, text);
        VectorRecord {
            id: chunk.id.clone(),
            embedding,
            chunk,
        }
    }

    #[test]
    fn test_embedding_blob_roundtrip() {
        let v = vec![0.5, -1.25, 3.0];
        assert_eq!(decode_embedding(&encode_embedding(&v)), v);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_reads_do_not_create_database() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("index").join("index.db");
        let backend = SqliteBackend::new(&db, "guidelines");

        assert!(!backend.collection_exists().await.unwrap());
        assert_eq!(backend.count().await.unwrap(), 0);
        assert!(backend.search(&[1.0, 0.0], 3).await.unwrap().is_empty());
        assert!(!backend.delete_collection().await.unwrap());
        assert!(!db.exists());
    }

    #[tokio::test]
    async fn test_upsert_search_and_delete() {
        let dir = TempDir::new().unwrap();
        let backend = SqliteBackend::new(&dir.path().join("index.db"), "guidelines");
        backend.ensure_collection(2).await.unwrap();
        assert!(backend.collection_exists().await.unwrap());

        let iron = record("a.md", "iron", vec![1.0, 0.0]);
        let wash = record("b.md", "wash", vec![0.0, 1.0]);
        backend
            .upsert(vec![iron.clone(), wash.clone()])
            .await
            .unwrap();

        // Same id overwrites
        backend.upsert(vec![iron.clone()]).await.unwrap();
        assert_eq!(backend.count().await.unwrap(), 2);

        let hits = backend.search(&[0.9, 0.1], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk, iron.chunk);

        let ids = vec![iron.id.clone(), "missing".to_string()];
        let existing = backend.existing_ids(&ids).await.unwrap();
        assert!(existing.contains(&iron.id));
        assert!(!existing.contains("missing"));

        assert!(backend.delete_collection().await.unwrap());
        assert!(!backend.collection_exists().await.unwrap());
        assert_eq!(backend.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dimension_conflict() {
        let dir = TempDir::new().unwrap();
        let backend = SqliteBackend::new(&dir.path().join("index.db"), "guidelines");
        backend.ensure_collection(2).await.unwrap();
        backend.ensure_collection(2).await.unwrap();

        assert!(matches!(
            backend.ensure_collection(3).await,
            Err(Error::Config(_))
        ));
        assert!(matches!(
            backend.search(&[1.0, 0.0, 0.0], 1).await,
            Err(Error::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("index.db");
        let first = SqliteBackend::new(&db, "first");
        let second = SqliteBackend::new(&db, "second");

        first.ensure_collection(2).await.unwrap();
        first
            .upsert(vec![record("a.md", "iron", vec![1.0, 0.0])])
            .await
            .unwrap();

        assert!(!second.collection_exists().await.unwrap());
        assert_eq!(second.count().await.unwrap(), 0);
    }
}
