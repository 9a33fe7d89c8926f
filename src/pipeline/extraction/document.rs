//! Bill document loading.
//!
//! Bills arrive either as plain text (committee drafts, scraped pages) or
//! as PDFs published by the legislature. PDFs are read per page and joined
//! so page-marker cleanup downstream sees the same shape as text files.

use std::fs;
use std::path::Path;

use super::ExtractionError;

/// Reads a bill document into raw text. Dispatches on the file extension:
/// `.pdf` goes through the PDF text extractor, anything else is read as
/// UTF-8 text.
pub fn load_document_text(path: &Path) -> Result<String, ExtractionError> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        load_pdf_text(path)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn load_pdf_text(path: &Path) -> Result<String, ExtractionError> {
    let bytes = fs::read(path)?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;
    Ok(pages.join("\n"))
}
