//! PDF text extraction for uploaded study material and resumes.
//!
//! Only the first `MAX_PAGES` pages are read; the page count reported is the
//! document's full length.

use lopdf::Document;
use thiserror::Error;
use tracing::{debug, info};

pub const MAX_PAGES: usize = 10;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Could not read PDF: {0}")]
    Unreadable(String),

    #[error("PDF has no pages")]
    NoPages,

    #[error("No extractable text found in PDF (scanned documents are not supported)")]
    NoText,
}

#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub page_count: u32,
}

pub fn extract_pdf_text(bytes: &[u8]) -> Result<ExtractedDocument, DocumentError> {
    let document =
        Document::load_mem(bytes).map_err(|e| DocumentError::Unreadable(e.to_string()))?;

    let pages = page_numbers(&document);
    if pages.is_empty() {
        return Err(DocumentError::NoPages);
    }
    let page_count = pages.len() as u32;

    let mut text = String::new();
    let mut found_text = false;
    for &page in pages_to_read(&pages) {
        let page_text = match document.extract_text(&[page]) {
            Ok(t) => t,
            Err(e) => {
                debug!("Skipping page {page}: {e}");
                String::new()
            }
        };
        let page_text = page_text.split_whitespace().collect::<Vec<_>>().join(" ");
        found_text |= !page_text.is_empty();
        text.push_str(&format!("\n--- Page {page} ---\n{page_text}"));
    }

    if !found_text {
        // The fallback sees only the pages read above, without per-page markers.
        debug!("Per-page extraction found no text, falling back to pdf-extract");
        let capped = first_pages_only(&document, &pages)?;
        text = pdf_extract::extract_text_from_mem(&capped)
            .map_err(|e| DocumentError::Unreadable(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(DocumentError::NoText);
        }
    }

    info!(
        "Extracted {} chars from PDF ({} pages, read {})",
        text.len(),
        page_count,
        pages.len().min(MAX_PAGES)
    );

    Ok(ExtractedDocument { text, page_count })
}

fn page_numbers(document: &Document) -> Vec<u32> {
    document.get_pages().keys().copied().collect()
}

fn pages_to_read(pages: &[u32]) -> &[u32] {
    &pages[..pages.len().min(MAX_PAGES)]
}

/// Re-serializes `document` with every page past `MAX_PAGES` removed.
fn first_pages_only(document: &Document, pages: &[u32]) -> Result<Vec<u8>, DocumentError> {
    let mut capped = document.clone();
    let extra = &pages[pages_to_read(pages).len()..];
    if !extra.is_empty() {
        capped.delete_pages(extra);
    }
    let mut buf = Vec::new();
    capped
        .save_to(&mut buf)
        .map_err(|e| DocumentError::Unreadable(e.to_string()))?;
    Ok(buf)
}

/// Truncates to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use lopdf::{dictionary, Object};

    use super::*;

    /// Builds an in-memory PDF with `count` blank pages.
    fn blank_pdf(count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..count)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                })
                .into()
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count as i64,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_garbage_bytes_are_unreadable() {
        let err = extract_pdf_text(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, DocumentError::Unreadable(_)));
    }

    #[test]
    fn test_page_count_covers_whole_document() {
        let bytes = blank_pdf(12);
        let document = Document::load_mem(&bytes).unwrap();
        let pages = page_numbers(&document);

        assert_eq!(pages.len(), 12);
        assert_eq!(pages_to_read(&pages), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_fallback_input_is_capped_to_first_pages() {
        let bytes = blank_pdf(12);
        let document = Document::load_mem(&bytes).unwrap();
        let pages = page_numbers(&document);

        let capped = first_pages_only(&document, &pages).unwrap();
        let reloaded = Document::load_mem(&capped).unwrap();
        assert_eq!(reloaded.get_pages().len(), MAX_PAGES);
    }

    #[test]
    fn test_short_documents_are_not_rewritten_with_fewer_pages() {
        let bytes = blank_pdf(3);
        let document = Document::load_mem(&bytes).unwrap();
        let pages = page_numbers(&document);

        let capped = first_pages_only(&document, &pages).unwrap();
        assert_eq!(Document::load_mem(&capped).unwrap().get_pages().len(), 3);
    }

    #[test]
    fn test_short_documents_are_read_in_full() {
        let pages = vec![1, 2, 3];
        assert_eq!(pages_to_read(&pages), &[1, 2, 3]);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }
}
