// src/fetch.rs

//! Conditional HTTP fetching.
//!
//! Performs one GET per source with a bounded timeout and a descriptive
//! user-agent. When cached validators are known they are sent as
//! `If-None-Match`/`If-Modified-Since`, letting the server answer
//! `304 Not Modified` without a body. Stateless; retries belong to the
//! orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ContentKind, FetcherConfig, Source};

/// Cache-related response headers, any of which may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportHints {
    #[serde(default)]
    pub etag: Option<String>,

    #[serde(default)]
    pub last_modified: Option<String>,

    #[serde(default)]
    pub content_length: Option<u64>,
}

impl TransportHints {
    /// Read hints from response headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            etag: text(header::ETAG),
            last_modified: text(header::LAST_MODIFIED),
            content_length: headers
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok()),
        }
    }

    /// All three hints present.
    pub fn is_complete(&self) -> bool {
        self.etag.is_some() && self.last_modified.is_some() && self.content_length.is_some()
    }

    /// Validators usable for a conditional request.
    pub fn has_validators(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }
}

/// Raw payload of a completed fetch. Consumed once by extraction.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub bytes: Vec<u8>,
    pub kind: ContentKind,
    pub status: u16,
    pub hints: TransportHints,
    pub fetched_at: DateTime<Utc>,
}

/// Outcome of one fetch attempt.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Server asserted the content is unchanged; no body was transferred
    NotModified { fetched_at: DateTime<Utc> },

    /// Body fetched with a 2xx status
    Fetched(FetchResult),
}

/// Seam between the pipeline and the network.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch one source, sending conditional headers from `cached` when
    /// validators are available.
    async fn fetch(&self, source: &Source, cached: Option<&TransportHints>)
    -> Result<FetchOutcome>;
}

/// Production fetcher backed by a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from the configured user-agent and timeout.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(
        &self,
        source: &Source,
        cached: Option<&TransportHints>,
    ) -> Result<FetchOutcome> {
        let mut request = self.client.get(&source.url);
        if let Some(hints) = cached {
            if let Some(etag) = &hints.etag {
                request = request.header(header::IF_NONE_MATCH, etag.as_str());
            }
            if let Some(lm) = &hints.last_modified {
                request = request.header(header::IF_MODIFIED_SINCE, lm.as_str());
            }
        }

        let response = request.send().await?;
        let fetched_at = Utc::now();
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            return Ok(FetchOutcome::NotModified { fetched_at });
        }
        if !status.is_success() {
            return Err(AppError::FetchStatus {
                url: source.url.clone(),
                status: status.as_u16(),
            });
        }

        let hints = TransportHints::from_headers(response.headers());
        let kind = resolve_kind(source, response.headers());
        let bytes = response.bytes().await?.to_vec();

        Ok(FetchOutcome::Fetched(FetchResult {
            bytes,
            kind,
            status: status.as_u16(),
            hints,
            fetched_at,
        }))
    }
}

/// Declared kind wins, then the Content-Type header, then the URL extension.
fn resolve_kind(source: &Source, headers: &HeaderMap) -> ContentKind {
    if let Some(kind) = source.kind {
        return kind;
    }
    if let Some(ct) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        let ct = ct.to_ascii_lowercase();
        if ct.contains("application/pdf") {
            return ContentKind::Pdf;
        }
        if ct.contains("text/html") || ct.contains("application/xhtml") {
            return ContentKind::Html;
        }
    }
    ContentKind::guess(&source.url)
}
