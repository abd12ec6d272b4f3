// src/cache.rs

//! Durable per-source cache.
//!
//! One record per source id, stored as `<root>/<id>/record.json`. Writers
//! produce the new record in a temp file and atomically rename it over the
//! canonical path, so a reader sees either the fully-old or fully-new record.
//! A reader observing a transient absence treats the source as first-seen for
//! that run; the next completed run heals the record.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::fetch::TransportHints;

/// Marker appended to cached content cut at the size cap.
pub const TRUNCATION_MARKER: &str = "\n[truncated]";

/// Last known state of one source.
///
/// Signature and content are always written together; the record is replaced
/// wholesale, never patched field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub signature: String,
    pub content: String,

    /// True when `content` was cut at the cap
    #[serde(default)]
    pub truncated: bool,

    /// Response hints saved for the next conditional request
    #[serde(default)]
    pub hints: TransportHints,

    pub fetched_at: DateTime<Utc>,
}

impl CacheRecord {
    /// Build a record, truncating content at `max_chars` with a marker.
    pub fn new(
        signature: String,
        content: &str,
        max_chars: usize,
        hints: TransportHints,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let truncated = content.chars().count() > max_chars;
        let content = if truncated {
            let mut cut: String = content.chars().take(max_chars).collect();
            cut.push_str(TRUNCATION_MARKER);
            cut
        } else {
            content.to_string()
        };
        Self {
            signature,
            content,
            truncated,
            hints,
            fetched_at,
        }
    }
}

/// Key-value store with atomic replace, keyed by source id.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Load the record for a source, or `None` if never written.
    async fn load(&self, source_id: &str) -> Result<Option<CacheRecord>>;

    /// Atomically replace the record for a source.
    async fn save(&self, source_id: &str, record: &CacheRecord) -> Result<()>;

    /// Refresh only the last-fetched timestamp, leaving signature and
    /// content untouched. A no-op when no record exists.
    async fn touch(&self, source_id: &str, fetched_at: DateTime<Utc>) -> Result<()>;
}

/// Filesystem-backed cache store, one directory per source.
#[derive(Clone)]
pub struct FsCacheStore {
    root_dir: PathBuf,
}

impl FsCacheStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn record_path(&self, source_id: &str) -> PathBuf {
        self.root_dir.join(source_id).join("record.json")
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn load(&self, source_id: &str) -> Result<Option<CacheRecord>> {
        let path = self.record_path(source_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::cache(format!("read {}: {e}", path.display()))),
        };
        let record = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::cache(format!("corrupt record {}: {e}", path.display())))?;
        Ok(Some(record))
    }

    async fn save(&self, source_id: &str, record: &CacheRecord) -> Result<()> {
        let path = self.record_path(source_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::cache(format!("mkdir {}: {e}", parent.display())))?;
        }

        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| AppError::cache(format!("encode record for {source_id}: {e}")))?;

        let tmp = path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| AppError::cache(format!("create {}: {e}", tmp.display())))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| AppError::cache(format!("write {}: {e}", tmp.display())))?;
        file.flush()
            .await
            .map_err(|e| AppError::cache(format!("flush {}: {e}", tmp.display())))?;
        drop(file);

        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| AppError::cache(format!("rename into {}: {e}", path.display())))?;
        Ok(())
    }

    async fn touch(&self, source_id: &str, fetched_at: DateTime<Utc>) -> Result<()> {
        match self.load(source_id).await? {
            Some(mut record) => {
                record.fetched_at = fetched_at;
                self.save(source_id, &record).await
            }
            None => Ok(()),
        }
    }
}
