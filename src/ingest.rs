//! Guideline corpus ingestion
//!
//! Walks the docs directory, extracts page texts from every supported file
//! and splits them into content-addressed chunks. Unreadable files are
//! logged and skipped so one bad document never blocks a rebuild.

use crate::chunk::{chunk_page, GuidelineChunk};
use crate::config::ChunkConfig;
use crate::parse::{load_document, DocumentFormat};
use crate::progress::{advance_progress, finish_progress, start_progress_bar};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of one pass over the docs directory
#[derive(Debug, Clone, Default)]
pub struct IngestedCorpus {
    /// Files with a recognised extension
    pub files_seen: usize,

    /// Page texts (or whole documents) successfully extracted
    pub loaded_docs: usize,

    /// Unique chunks in discovery order
    pub chunks: Vec<GuidelineChunk>,
}

/// Supported guideline files under `docs_dir`, sorted by path.
///
/// Ignore files are not consulted: every guideline on disk is indexed.
pub fn discover_files(docs_dir: &Path) -> Vec<PathBuf> {
    if !docs_dir.is_dir() {
        return Vec::new();
    }

    let walker = WalkBuilder::new(docs_dir)
        .hidden(false)
        .parents(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build();

    let mut files: Vec<PathBuf> = walker
        .filter_map(|entry| entry.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.into_path())
        .filter(|p| DocumentFormat::from_extension(p).is_some())
        .collect();

    files.sort();
    files
}

/// Path used as chunk provenance: relative to `docs_dir`, `/`-separated
pub fn source_name(docs_dir: &Path, path: &Path) -> String {
    path.strip_prefix(docs_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Load and chunk every guideline file under `docs_dir`.
///
/// A missing or empty directory yields an empty corpus.
pub fn ingest(docs_dir: &Path, config: &ChunkConfig) -> IngestedCorpus {
    ingest_files(docs_dir, &discover_files(docs_dir), config)
}

/// Load and chunk an already discovered file list
pub fn ingest_files(docs_dir: &Path, files: &[PathBuf], config: &ChunkConfig) -> IngestedCorpus {
    let mut corpus = IngestedCorpus {
        files_seen: files.len(),
        ..Default::default()
    };

    if files.is_empty() {
        info!("No guideline files found in {}", docs_dir.display());
        return corpus;
    }

    info!("Found {} guideline files in {}", files.len(), docs_dir.display());

    let mut seen_ids = HashSet::new();
    let progress = start_progress_bar(files.len(), "Reading guidelines");

    for path in files {
        advance_progress(&progress);

        let format = match DocumentFormat::from_extension(path) {
            Some(format) if format.is_enabled() => format,
            Some(format) => {
                warn!(
                    path = %path.display(),
                    "Skipping {} file: support not compiled in (enable the '{}' feature)",
                    format,
                    format
                );
                continue;
            }
            None => continue,
        };

        let pages = match load_document(path) {
            Ok(pages) => pages,
            Err(e) => {
                warn!(path = %path.display(), "Failed to read {} document: {}", format, e);
                continue;
            }
        };

        let source = source_name(docs_dir, path);
        corpus.loaded_docs += pages.len();

        let before = corpus.chunks.len();
        for page in &pages {
            for chunk in chunk_page(&source, page, config) {
                if seen_ids.insert(chunk.id.clone()) {
                    corpus.chunks.push(chunk);
                }
            }
        }
        debug!(
            "{}: {} pages, {} chunks",
            source,
            pages.len(),
            corpus.chunks.len() - before
        );
    }

    finish_progress(progress, "Guidelines read");
    info!(
        "Extracted {} chunks from {} documents",
        corpus.chunks.len(),
        corpus.loaded_docs
    );

    corpus
}
