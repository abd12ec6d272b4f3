//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP fetch behavior settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Text extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Batch orchestration settings
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetcher.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetcher.user_agent is empty"));
        }
        if self.fetcher.timeout_secs == 0 {
            return Err(AppError::validation("fetcher.timeout_secs must be > 0"));
        }
        if self.batch.max_concurrent == 0 {
            return Err(AppError::validation("batch.max_concurrent must be > 0"));
        }
        if self.extraction.default_selector.trim().is_empty() {
            return Err(AppError::validation("extraction.default_selector is empty"));
        }
        if self.extraction.max_content_chars == 0 {
            return Err(AppError::validation(
                "extraction.max_content_chars must be > 0",
            ));
        }
        Ok(())
    }
}

/// HTTP fetch behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Text extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// CSS selector used for HTML sources without a per-source override
    #[serde(default = "defaults::default_selector")]
    pub default_selector: String,

    /// Cap on cached content; longer text is truncated with a marker
    #[serde(default = "defaults::max_content_chars")]
    pub max_content_chars: usize,

    /// Below this many characters, PDF extraction falls back to the
    /// secondary pass
    #[serde(default = "defaults::min_pdf_chars")]
    pub min_pdf_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_selector: defaults::default_selector(),
            max_content_chars: defaults::max_content_chars(),
            min_pdf_chars: defaults::min_pdf_chars(),
        }
    }
}

/// Batch orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum sources in flight at once; targets are rate-sensitive
    /// government servers, so keep this small
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Delay between completed sources in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Retries for transient transport failures
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base backoff in milliseconds, doubled per attempt
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            request_delay_ms: defaults::request_delay(),
            max_retries: defaults::max_retries(),
            retry_backoff_ms: defaults::retry_backoff(),
        }
    }
}

mod defaults {
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; regwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn default_selector() -> String {
        "main, article, section, h1, h2, h3".into()
    }
    pub fn max_content_chars() -> usize {
        20_000
    }
    pub fn min_pdf_chars() -> usize {
        16
    }
    pub fn max_concurrent() -> usize {
        8
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn retry_backoff() -> u64 {
        600
    }
}
