// src/registry.rs

//! Explicit source registry.
//!
//! Built once at startup from the source-list provider and passed by
//! reference into the orchestrator. Lookup is either by source id or by
//! longest-prefix match over the exact set of registered URLs; there is no
//! dynamic discovery or implicit fallback.

use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::models::Source;

/// Registered sources with id and URL lookup.
pub struct SourceRegistry {
    sources: Vec<Source>,
    by_id: HashMap<String, usize>,
}

impl SourceRegistry {
    /// Build a registry, rejecting duplicate source ids.
    pub fn new(sources: Vec<Source>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(sources.len());
        for (index, source) in sources.iter().enumerate() {
            if by_id.insert(source.id.clone(), index).is_some() {
                return Err(AppError::validation(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }
        }
        Ok(Self { sources, by_id })
    }

    pub fn get(&self, id: &str) -> Option<&Source> {
        self.by_id.get(id).map(|&i| &self.sources[i])
    }

    /// All registered sources in registration order.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Resolve an arbitrary URL to the registered source with the longest
    /// matching URL prefix. Ties go to the first-registered source; a URL
    /// matching nothing is an explicit error.
    pub fn match_url(&self, url: &str) -> Result<&Source> {
        let mut best: Option<(usize, usize)> = None; // (prefix_len, index)
        for (index, source) in self.sources.iter().enumerate() {
            if url.starts_with(&source.url) {
                let len = source.url.len();
                let better = match best {
                    None => true,
                    Some((best_len, _)) => len > best_len,
                };
                if better {
                    best = Some((len, index));
                }
            }
        }
        best.map(|(_, i)| &self.sources[i])
            .ok_or_else(|| AppError::NoMatch(url.to_string()))
    }
}
