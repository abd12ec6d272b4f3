// src/error.rs

//! Unified error handling for the change-detection engine.

use std::fmt;

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP transport failure (timeout, DNS, refused connection)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx/non-304 HTTP status
    #[error("fetch failed for {url}: HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    /// Payload could not be parsed by any extraction path
    #[error("extraction failed for {context}: {message}")]
    Extraction { context: String, message: String },

    /// Internal signature invariant violation (inconsistent transport hints)
    #[error("signature error: {0}")]
    Signature(String),

    /// Cache storage failure on read or write
    #[error("cache error: {0}")]
    Cache(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// No registered source matches the given URL
    #[error("no registered source matches '{0}'")]
    NoMatch(String),
}

impl AppError {
    /// Create an extraction error with context.
    pub fn extraction(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extraction {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a signature error.
    pub fn signature(message: impl Into<String>) -> Self {
        Self::Signature(message.into())
    }

    /// Create a cache error.
    pub fn cache(message: impl fmt::Display) -> Self {
        Self::Cache(message.to_string())
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether a bounded retry may succeed.
    ///
    /// Transport-level failures and 5xx statuses are transient; 4xx statuses
    /// and parse failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::FetchStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Pipeline phase this error belongs to, for per-source error records.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Http(_) | Self::FetchStatus { .. } => "fetch",
            Self::Extraction { .. } | Self::Selector { .. } => "extract",
            Self::Signature(_) => "signature",
            Self::Cache(_) => "cache",
            _ => "other",
        }
    }
}
