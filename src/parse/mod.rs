//! Guideline document loading and text extraction
//!
//! Every supported format is reduced to a list of page texts. Formats
//! without pages (plain text, Markdown, Word) yield a single unpaged entry;
//! PDFs yield one entry per page with a 0-based page number.

#[cfg(feature = "docx")]
mod docx;
mod markdown;
#[cfg(feature = "pdf")]
mod pdf;

pub use markdown::*;

use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Document formats we can ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Markdown,
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Detect format from file extension (case-insensitive)
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "text" => Some(DocumentFormat::PlainText),
            "md" | "markdown" => Some(DocumentFormat::Markdown),
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }

    /// Whether this build can extract text from the format
    pub fn is_enabled(&self) -> bool {
        match self {
            DocumentFormat::PlainText | DocumentFormat::Markdown => true,
            DocumentFormat::Pdf => cfg!(feature = "pdf"),
            DocumentFormat::Docx => cfg!(feature = "docx"),
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::PlainText => write!(f, "text"),
            DocumentFormat::Markdown => write!(f, "markdown"),
            DocumentFormat::Pdf => write!(f, "pdf"),
            DocumentFormat::Docx => write!(f, "docx"),
        }
    }
}

/// Text of one page (or of a whole unpaged document)
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// 0-based page number, `None` for unpaged formats
    pub page: Option<u32>,
    pub text: String,
}

impl PageText {
    pub fn unpaged(text: String) -> Self {
        Self { page: None, text }
    }
}

/// Extract page texts from a document on disk
pub fn load_document(path: &Path) -> Result<Vec<PageText>> {
    let format = DocumentFormat::from_extension(path)
        .ok_or_else(|| Error::Parse(format!("unsupported document type: {}", path.display())))?;

    debug!("Extracting {} text from {:?}", format, path);

    let pages = match format {
        DocumentFormat::PlainText => {
            let bytes = std::fs::read(path)?;
            if is_binary_content(&bytes) {
                return Err(Error::Parse(format!("{} looks like a binary file", path.display())));
            }
            vec![PageText::unpaged(String::from_utf8_lossy(&bytes).into_owned())]
        }
        DocumentFormat::Markdown => {
            let content = std::fs::read_to_string(path)?;
            vec![PageText::unpaged(markdown_to_text(&content))]
        }
        #[cfg(feature = "pdf")]
        DocumentFormat::Pdf => pdf::extract_pages(path)?,
        #[cfg(feature = "docx")]
        DocumentFormat::Docx => vec![PageText::unpaged(docx::extract_text(path)?)],
        #[allow(unreachable_patterns)]
        other => {
            return Err(Error::Parse(format!(
                "{} support is not compiled in; rebuild with the '{}' feature",
                other, other
            )))
        }
    };

    Ok(pages
        .into_iter()
        .filter(|p| !p.text.trim().is_empty())
        .collect())
}

/// Check if content appears to be binary
pub fn is_binary_content(data: &[u8]) -> bool {
    // Check for null bytes in the first 8KB
    let check_len = std::cmp::min(data.len(), 8192);
    data[..check_len].iter().any(|&b| b == 0)
}
