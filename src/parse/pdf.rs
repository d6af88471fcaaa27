//! PDF text extraction

use super::PageText;
use crate::error::{Error, Result};
use std::path::Path;

/// One entry per PDF page, numbered from 0
pub fn extract_pages(path: &Path) -> Result<Vec<PageText>> {
    let pages = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| Error::Parse(format!("failed to extract text from {}: {}", path.display(), e)))?;

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageText {
            page: Some(i as u32),
            text,
        })
        .collect())
}
