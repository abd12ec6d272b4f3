// src/extract/mod.rs

//! Payload-to-text extraction.
//!
//! Branches on content kind: HTML goes through CSS selection, PDFs through
//! linear text extraction. Both paths emit normalized text so signatures stay
//! stable across incidental whitespace differences.

mod html;
mod pdf;

use crate::error::Result;
use crate::fetch::FetchResult;
use crate::models::{ContentKind, ExtractionConfig, Source};

/// Normalized text produced from one fetch. Consumed by the signature engine.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub text: String,
    pub kind: ContentKind,

    /// Selector or strategy actually used
    pub selector_used: Option<String>,

    /// Non-fatal extraction note (e.g. a PDF with no extractable text)
    pub warning: Option<String>,
}

/// Content extractor configured with selector and size defaults.
pub struct Extractor {
    config: ExtractionConfig,
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Convert raw payload bytes into normalized text.
    pub fn extract(&self, fetch: &FetchResult, source: &Source) -> Result<ExtractedContent> {
        match fetch.kind {
            ContentKind::Html => {
                let selector = source
                    .selector
                    .as_deref()
                    .unwrap_or(&self.config.default_selector);
                let outcome = html::extract(&fetch.bytes, selector)?;
                Ok(ExtractedContent {
                    text: normalize_text(&outcome.text),
                    kind: ContentKind::Html,
                    selector_used: Some(outcome.selector_used),
                    warning: None,
                })
            }
            ContentKind::Pdf => {
                let outcome = pdf::extract(&fetch.bytes, &source.url, self.config.min_pdf_chars)?;
                let text = normalize_text(&outcome.text);
                let warning = if text.is_empty() {
                    Some("no extractable text in PDF".to_string())
                } else {
                    None
                };
                Ok(ExtractedContent {
                    text,
                    kind: ContentKind::Pdf,
                    selector_used: Some(outcome.strategy),
                    warning,
                })
            }
        }
    }
}

/// Canonical text normalization applied before hashing.
///
/// CRLF/CR become LF, runs of spaces and tabs collapse to one space, lines
/// are trimmed, and empty lines are dropped. Changing this invalidates every
/// stored signature.
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = Vec::new();
    for line in unified.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            lines.push(collapsed);
        }
    }
    lines.join("\n")
}
