//! Public operation surface
//!
//! [`GrowthGuide`] wires the reference tables, the guideline index and the
//! recommendation composer together behind the three operations callers
//! use: `diagnose`, `recommend` and `build_index`.

use crate::config::Config;
use crate::embed::{create_embedder, Embedder, UnconfiguredEmbedder, CREDENTIAL_NOT_SET};
use crate::error::{Error, Result, Unavailable};
use crate::generate::{create_generator, Generator, UnconfiguredGenerator};
use crate::growth::{Diagnosis, GrowthStandards, Sex};
use crate::ingest::{discover_files, ingest_files, IngestedCorpus};
use crate::rag::{Answerer, GroundedAnswer};
use crate::recommend::{Composer, PatientContext, RecommendationResult};
use crate::store::{open_backend, ScoredChunk, UnavailableBackend, VectorBackend, VectorIndex};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

pub const NOTE_NO_FILES: &str = "no guideline files found";
pub const NOTE_NO_CREDENTIAL: &str = CREDENTIAL_NOT_SET;

/// Outcome of an index build
#[derive(Debug, Clone, Serialize)]
pub struct IndexBuildStats {
    pub docs_dir: PathBuf,
    pub persist_dir: PathBuf,
    pub collection: String,
    pub files_seen: usize,
    pub loaded_docs: usize,
    pub chunks: usize,
    pub chunks_upserted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Current state of the guideline index
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub backend: String,
    pub collection: String,
    pub exists: bool,
    pub records: usize,
    pub docs_dir: PathBuf,
    pub persist_dir: PathBuf,
}

pub struct GrowthGuide {
    config: Config,
    standards: OnceLock<GrowthStandards>,
    index: Arc<VectorIndex>,
    composer: Composer,
}

impl GrowthGuide {
    /// Build every component from configuration.
    ///
    /// Retrieval components that cannot be constructed are replaced by
    /// stand-ins that report the cause, so diagnosis keeps working and
    /// recommendations fall back.
    pub fn from_config(config: Config) -> Self {
        let embedder: Arc<dyn Embedder> = create_embedder(&config).unwrap_or_else(|e| {
            warn!("Embedding provider unavailable, recommendations will use the rule-based text: {}", e);
            Arc::new(UnconfiguredEmbedder::new(
                &config.embedding.model,
                config.embedding.resolved_dimension(),
                e,
            ))
        });

        let backend: Box<dyn VectorBackend> = open_backend(&config).unwrap_or_else(|e| {
            warn!("Guideline index unavailable: {}", e);
            Box::new(UnavailableBackend::new(e))
        });

        let generator: Arc<dyn Generator> = create_generator(&config).unwrap_or_else(|e| {
            warn!("Generation service unavailable: {}", e);
            Arc::new(UnconfiguredGenerator::new(&config.generation.model, e.to_string()))
        });

        let index = VectorIndex::new(backend, embedder, config.embedding.batch_size);
        Self::with_components(config, index, generator)
    }

    /// Assemble from an explicit index and generator
    pub fn with_components(config: Config, index: VectorIndex, generator: Arc<dyn Generator>) -> Self {
        let index = Arc::new(index);
        let answerer = Answerer::new(index.clone(), generator, config.rag.top_k);
        let composer = Composer::new(answerer, &config.generation.default_language);
        Self {
            config,
            standards: OnceLock::new(),
            index,
            composer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reference tables, loaded on first use and kept for the process lifetime
    pub fn standards(&self) -> Result<&GrowthStandards> {
        if let Some(standards) = self.standards.get() {
            return Ok(standards);
        }
        let loaded = GrowthStandards::load(&self.config.growth.tables_dir)?;
        Ok(self.standards.get_or_init(|| loaded))
    }

    pub fn diagnose(&self, sex: Sex, age_months: u32, weight_kg: f64, height_cm: f64) -> Result<Diagnosis> {
        self.standards()?
            .diagnose(sex, age_months, weight_kg, height_cm)
    }

    /// Never fails: every retrieval or generation problem yields the rule-based text
    pub async fn recommend(&self, diagnosis: &Diagnosis, patient: &PatientContext) -> RecommendationResult {
        if self.config.rag.auto_build {
            self.auto_build().await;
        }
        self.composer.compose(diagnosis, patient).await
    }

    /// Diagnose the patient's measurements, then recommend
    pub async fn assess(&self, patient: &PatientContext) -> Result<RecommendationResult> {
        let diagnosis = self.diagnose(
            patient.sex,
            patient.age_months,
            patient.weight_kg,
            patient.height_cm,
        )?;
        Ok(self.recommend(&diagnosis, patient).await)
    }

    async fn auto_build(&self) {
        match self.index.exists().await {
            Ok(true) => {}
            Ok(false) => {
                info!("No guideline index found, building one");
                match self.build_index(false).await {
                    Ok(stats) => info!("Auto-built index with {} chunks", stats.chunks_upserted),
                    Err(e) => warn!("Automatic index build failed: {}", e),
                }
            }
            Err(e) => warn!("Could not check the guideline index: {}", e),
        }
    }

    /// Ingest the docs directory and store new chunks
    pub async fn build_index(&self, force_rebuild: bool) -> Result<IndexBuildStats> {
        let rag = &self.config.rag;

        if force_rebuild && self.index.wipe().await? {
            info!("Removed existing collection {}", rag.collection_name);
        }

        let docs_dir = rag.docs_dir.clone();
        let files = tokio::task::spawn_blocking(move || discover_files(&docs_dir))
            .await
            .map_err(|e| Error::Other(format!("file discovery failed: {}", e)))?;

        let mut stats = IndexBuildStats {
            docs_dir: rag.docs_dir.clone(),
            persist_dir: rag.persist_dir.clone(),
            collection: rag.collection_name.clone(),
            files_seen: files.len(),
            loaded_docs: 0,
            chunks: 0,
            chunks_upserted: 0,
            note: None,
        };

        if files.is_empty() {
            warn!("No guideline files found in {:?}", rag.docs_dir);
            stats.note = Some(NOTE_NO_FILES.to_string());
            return Ok(stats);
        }

        // Nothing is parsed unless the chunks can actually be embedded
        if let Err(e) = self.index.embedder().check_ready() {
            warn!("Skipping index build: {}", e);
            stats.note = Some(match e {
                Error::Embedding(reason) => reason,
                other => other.to_string(),
            });
            return Ok(stats);
        }

        let docs_dir = rag.docs_dir.clone();
        let chunk_config = self.config.chunk.clone();
        let corpus: IngestedCorpus =
            tokio::task::spawn_blocking(move || ingest_files(&docs_dir, &files, &chunk_config))
                .await
                .map_err(|e| Error::Other(format!("ingestion task failed: {}", e)))?;

        stats.loaded_docs = corpus.loaded_docs;
        stats.chunks = corpus.chunks.len();
        stats.chunks_upserted = self.index.upsert(&corpus.chunks).await?;
        info!(
            "Index build complete: {} files, {} chunks, {} new",
            stats.files_seen, stats.chunks, stats.chunks_upserted
        );
        Ok(stats)
    }

    pub async fn index_status(&self) -> Result<IndexStatus> {
        let exists = self.index.exists().await?;
        let records = if exists { self.index.count().await? } else { 0 };
        Ok(IndexStatus {
            backend: self.index.describe(),
            collection: self.config.rag.collection_name.clone(),
            exists,
            records,
            docs_dir: self.config.rag.docs_dir.clone(),
            persist_dir: self.config.rag.persist_dir.clone(),
        })
    }

    /// Raw retrieval, for inspecting what the answerer would see
    pub async fn query(&self, text: &str, k: usize) -> std::result::Result<Vec<ScoredChunk>, Unavailable> {
        self.index.query(text, k).await
    }

    /// Free-form grounded question
    pub async fn ask(&self, question: &str) -> std::result::Result<GroundedAnswer, Unavailable> {
        self.composer.answerer().answer(question).await
    }
}
