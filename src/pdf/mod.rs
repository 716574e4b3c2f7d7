// PDF document loading
// Extracts per-page text units that feed the chunking pipeline

#[cfg(test)]
mod tests;

use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use crate::{RagError, Result};

/// Text extracted from a single PDF page
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// 1-based page number
    pub page_number: u32,
    pub text: String,
}

/// Load all pages of a PDF as ordered text units.
///
/// Fails with [`RagError::PdfNotFound`] before opening the file when the path
/// does not resolve to an existing file. Pages that yield no extractable text
/// are skipped with a warning.
#[inline]
pub fn load_pages<P: AsRef<Path>>(path: P) -> Result<Vec<PageText>> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(RagError::PdfNotFound(path.to_path_buf()));
    }

    debug!("Loading PDF: {}", path.display());

    let document = Document::load(path)
        .map_err(|e| RagError::Pdf(format!("Failed to parse {}: {}", path.display(), e)))?;

    let mut pages = Vec::new();
    for (page_number, _object_id) in document.get_pages() {
        match document.extract_text(&[page_number]) {
            Ok(text) => {
                if text.trim().is_empty() {
                    warn!("Page {} contains no extractable text, skipping", page_number);
                    continue;
                }
                pages.push(PageText { page_number, text });
            }
            Err(e) => {
                warn!("Failed to extract text from page {}: {}", page_number, e);
            }
        }
    }

    debug!("Loaded {} pages with text from {}", pages.len(), path.display());

    Ok(pages)
}
