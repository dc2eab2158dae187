//! Per-page PDF text extraction.
//!
//! Wraps `pdf-extract` to produce one [`DocumentPage`] per readable page.
//! Pages that yield no text (scanned images, extraction glitches) are
//! skipped with a warning and do not abort the remaining pages. A wholly
//! unreadable PDF is an error for the caller to handle.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::DocumentPage;

/// Extract page texts from a PDF on disk, in page order.
///
/// Page numbers are 1-based. Unreadable or empty pages are dropped, so
/// the returned sequence may have gaps in `page_number`.
pub fn extract_pages(path: &Path) -> Result<Vec<DocumentPage>> {
    let page_texts = pdf_extract::extract_text_by_pages(path)
        .with_context(|| format!("Failed to extract text from PDF: {}", path.display()))?;

    let mut pages = Vec::with_capacity(page_texts.len());
    for (i, text) in page_texts.into_iter().enumerate() {
        let page_number = (i + 1) as u32;
        if text.trim().is_empty() {
            warn!(
                file = %path.display(),
                page = page_number,
                "page yielded no extractable text, skipping"
            );
            continue;
        }
        pages.push(DocumentPage { page_number, text });
    }

    Ok(pages)
}
