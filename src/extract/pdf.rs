// src/extract/pdf.rs

//! PDF text extraction.
//!
//! Primary pass extracts page by page, skipping pages that fail to decode.
//! If the result is empty or near-empty, a secondary whole-document pass
//! runs. Both passes yielding nothing is an extraction warning, not an
//! error; only unparseable bytes fail.

use lopdf::Document;

use crate::error::{AppError, Result};

pub struct PdfOutcome {
    pub text: String,

    /// "pdf-pages" for the primary pass, "pdf-document" for the fallback
    pub strategy: String,
}

pub fn extract(bytes: &[u8], url: &str, min_chars: usize) -> Result<PdfOutcome> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| AppError::extraction(url, format!("unparseable PDF: {e}")))?;

    let primary = extract_by_page(&doc);
    if primary.trim().len() >= min_chars {
        return Ok(PdfOutcome {
            text: primary,
            strategy: "pdf-pages".into(),
        });
    }

    let fallback = extract_whole(&doc);
    if fallback.trim().len() > primary.trim().len() {
        return Ok(PdfOutcome {
            text: fallback,
            strategy: "pdf-document".into(),
        });
    }

    Ok(PdfOutcome {
        text: primary,
        strategy: "pdf-pages".into(),
    })
}

/// Per-page extraction; undecodable pages are skipped.
fn extract_by_page(doc: &Document) -> String {
    let mut parts = Vec::new();
    for (page_num, _) in doc.get_pages() {
        if let Ok(page_text) = doc.extract_text(&[page_num]) {
            let trimmed = page_text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
    }
    parts.join("\n\n")
}

/// Single extraction call over every page at once.
fn extract_whole(doc: &Document) -> String {
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages)
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    /// Build a minimal one-page PDF containing the given line of text.
    fn sample_pdf(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
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
    fn test_extracts_page_text() {
        let bytes = sample_pdf("Permit list A for district twelve");
        let outcome = extract(&bytes, "https://example.gov/permits.pdf", 16).unwrap();
        assert_eq!(outcome.strategy, "pdf-pages");
        assert!(outcome.text.contains("Permit list A"));
    }

    #[test]
    fn test_malformed_bytes_are_an_error() {
        let err = extract(b"<html>not a pdf</html>", "https://example.gov/x.pdf", 16);
        assert!(err.is_err());
    }

    #[test]
    fn test_short_text_still_returned() {
        // Below min_chars both passes see the same content; the primary
        // result is kept rather than erroring out.
        let bytes = sample_pdf("ok");
        let outcome = extract(&bytes, "https://example.gov/tiny.pdf", 16).unwrap();
        assert!(outcome.text.contains("ok"));
    }
}
