//! Monitored source definitions.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Declared payload kind of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Html,
    Pdf,
}

impl ContentKind {
    /// Guess the kind from a URL (query string ignored).
    pub fn guess(url: &str) -> Self {
        let path = url.split('?').next().unwrap_or(url);
        if path.to_ascii_lowercase().ends_with(".pdf") {
            ContentKind::Pdf
        } else {
            ContentKind::Html
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Html => "html",
            ContentKind::Pdf => "pdf",
        }
    }
}

/// A monitored target: URL plus extraction configuration.
///
/// Immutable once generated except for `active` and `selector`, which the
/// source-management layer may edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Stable slug derived from the URL (filled in when absent)
    #[serde(default)]
    pub id: String,

    /// Absolute URL to monitor
    pub url: String,

    /// Payload kind (inferred from the URL when unset)
    #[serde(default)]
    pub kind: Option<ContentKind>,

    /// CSS selector override for HTML extraction
    #[serde(default)]
    pub selector: Option<String>,

    /// Jurisdiction tag (e.g. "tx", "ca", "federal")
    #[serde(default)]
    pub jurisdiction: Option<String>,

    /// Inactive sources are skipped by the orchestrator
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Source {
    /// Build a source from a URL, deriving the id slug and kind.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: derive_id(&url),
            url,
            kind: None,
            selector: None,
            jurisdiction: None,
            active: true,
        }
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_jurisdiction(mut self, jurisdiction: impl Into<String>) -> Self {
        self.jurisdiction = Some(jurisdiction.into());
        self
    }

    /// Declared kind, or a guess from the URL.
    pub fn resolved_kind(&self) -> ContentKind {
        self.kind.unwrap_or_else(|| ContentKind::guess(&self.url))
    }

    /// Fill in a missing id from the URL; existing ids are kept.
    pub fn ensure_id(&mut self) {
        if self.id.trim().is_empty() {
            self.id = derive_id(&self.url);
        }
    }
}

/// Derive a stable source id from a URL: `<host-slug>-<path-slug>`.
pub fn derive_id(url: &str) -> String {
    let host = host_slug(url);
    let path = path_slug(url);
    if path == "root" {
        host
    } else {
        format!("{host}-{path}")
    }
}

/// Slugify arbitrary text: lowercase, non-alphanumerics collapsed to `-`.
pub fn slugify(s: &str, max_len: usize) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let re = NON_ALNUM.get_or_init(|| Regex::new("[^a-z0-9]+").expect("valid literal regex"));

    let lowered = s.trim().to_lowercase();
    let stripped = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);

    // The replacement leaves pure ASCII, so byte truncation is safe.
    let mut out = re.replace_all(stripped, "-").trim_matches('-').to_string();
    if out.len() > max_len {
        out.truncate(max_len);
        out = out.trim_end_matches('-').to_string();
    }
    if out.is_empty() { "source".into() } else { out }
}

fn host_slug(url: &str) -> String {
    match Url::parse(url) {
        Ok(u) => {
            let host = u.host_str().unwrap_or("host");
            let host = host.strip_prefix("www.").unwrap_or(host);
            slugify(host, 50)
        }
        Err(_) => "host".into(),
    }
}

fn path_slug(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "root".into();
    };
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).take(4).collect())
        .unwrap_or_default();
    if segments.is_empty() {
        return "root".into();
    }
    let joined = segments
        .iter()
        .map(|seg| slugify(seg, 20))
        .collect::<Vec<_>>()
        .join("-");
    if joined.is_empty() { "root".into() } else { joined }
}
