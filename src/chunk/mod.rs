//! Text chunking with stable content identifiers
//!
//! This module handles splitting page texts into chunks while:
//! - Keeping windows at a fixed character budget with a fixed overlap
//! - Preferring paragraph, then line, then word boundaries near the window end
//! - Deriving each chunk id from its source, page and normalized text, so
//!   re-ingesting unchanged files produces identical ids

mod boundaries;

pub use boundaries::*;

use crate::config::ChunkConfig;
use crate::parse::PageText;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// A guideline text chunk with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineChunk {
    /// SHA-1 hex digest of source, page and normalized text
    pub id: String,

    /// Normalized chunk text
    pub text: String,

    /// Source document path, relative to the docs directory
    pub source_path: String,

    /// 0-based page for paged formats
    pub page: Option<u32>,
}

impl GuidelineChunk {
    pub fn new(source_path: &str, page: Option<u32>, text: &str) -> Self {
        let text = normalize_text(text);
        Self {
            id: chunk_id(source_path, page, &text),
            text,
            source_path: source_path.to_string(),
            page,
        }
    }

    /// Human-readable provenance, e.g. `who/feeding.pdf p.3`
    pub fn citation(&self) -> String {
        match self.page {
            Some(page) => format!("{} p.{}", self.source_path, page + 1),
            None => self.source_path.clone(),
        }
    }
}

/// Trim and collapse every whitespace run to a single space
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stable chunk identifier: `sha1(source \n page-or-empty \n normalized_text)`
pub fn chunk_id(source_path: &str, page: Option<u32>, normalized_text: &str) -> String {
    let page = page.map(|p| p.to_string()).unwrap_or_default();
    let mut hasher = Sha1::new();
    hasher.update(source_path.as_bytes());
    hasher.update(b"\n");
    hasher.update(page.as_bytes());
    hasher.update(b"\n");
    hasher.update(normalized_text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Split text into overlapping windows of at most `size` characters
pub fn split_windows(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let size = size.max(1);

    let mut windows = Vec::new();
    let mut start = 0;

    while start < total {
        let hard_end = std::cmp::min(start + size, total);
        let end = if hard_end < total {
            find_best_break(&chars, start, hard_end)
                .map(|bp| bp.position)
                .unwrap_or(hard_end)
        } else {
            total
        };

        windows.push(chars[start..end].iter().collect());

        if end >= total {
            break;
        }

        // Step back by the overlap, but always make progress
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    windows
}

/// Chunk one page of a source document
pub fn chunk_page(source_path: &str, page: &PageText, config: &ChunkConfig) -> Vec<GuidelineChunk> {
    split_windows(&page.text, config.chunk_size, config.chunk_overlap)
        .iter()
        .map(|window| GuidelineChunk::new(source_path, page.page, window))
        .filter(|chunk| !chunk.text.is_empty())
        .collect()
}
