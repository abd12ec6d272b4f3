// src/signature.rs

//! Content signatures and change classification.
//!
//! A signature is a short deterministic string identifying one version of a
//! source's content. Transport hints (ETag + Last-Modified + Content-Length)
//! are preferred when complete and internally consistent, since they spare a
//! hash over the body on unchanged pages; the SHA-256 of the normalized
//! extracted text is the correctness fallback. PDF servers routinely emit
//! unstable hints, so PDF sources always hash.
//!
//! Equality is byte-exact string comparison. Two fetches producing
//! semantically identical but differently-encoded bytes are reported as
//! changed; that is a documented limitation.

use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::extract::ExtractedContent;
use crate::fetch::FetchResult;
use crate::models::ContentKind;

/// How a new signature relates to the cached one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    /// No prior record exists
    FirstSeen,
    Changed,
    Unchanged,
}

/// Compute the signature for one fetch.
pub fn compute(fetch: &FetchResult, content: &ExtractedContent) -> String {
    if fetch.kind == ContentKind::Html && fetch.hints.is_complete() {
        match transport_signature(fetch) {
            Ok(sig) => return sig,
            // Inconsistent hints are never fatal; the hash is authoritative.
            Err(e) => log::debug!("{e}; falling back to content hash"),
        }
    }
    content_signature(&content.text)
}

/// SHA-256 over normalized text, hex-encoded.
pub fn content_signature(text: &str) -> String {
    format!("sha256={}", hex::encode(Sha256::digest(text.as_bytes())))
}

/// Composite signature from complete transport hints.
///
/// Fails with a signature error when the advertised Content-Length does not
/// match the observed payload, which covers spoofed or stale headers.
fn transport_signature(fetch: &FetchResult) -> Result<String> {
    let hints = &fetch.hints;
    let (Some(etag), Some(lm), Some(cl)) = (
        hints.etag.as_deref(),
        hints.last_modified.as_deref(),
        hints.content_length,
    ) else {
        return Err(AppError::signature("incomplete transport hints"));
    };

    if cl != fetch.bytes.len() as u64 {
        return Err(AppError::signature(format!(
            "Content-Length {cl} does not match payload of {} bytes",
            fetch.bytes.len()
        )));
    }

    Ok(format!("etag={etag}|lm={lm}|cl={cl}"))
}

/// Compare a freshly computed signature against the cached one.
pub fn classify(new: &str, cached: Option<&str>) -> ChangeClass {
    match cached {
        None => ChangeClass::FirstSeen,
        Some(old) if old == new => ChangeClass::Unchanged,
        Some(_) => ChangeClass::Changed,
    }
}
