// src/pipeline/run.rs

//! Single-source pipeline execution.
//!
//! `run_one` composes fetch → extract → signature → cache-save strictly in
//! order. A `304 Not Modified` short-circuits before extraction; cache read
//! failures degrade to first-seen; cache write failures are flagged on the
//! result instead of failing the run.

use std::path::Path;
use std::sync::Arc;

use crate::cache::{CacheRecord, CacheStore, FsCacheStore};
use crate::error::Result;
use crate::extract::Extractor;
use crate::fetch::{Fetch, FetchOutcome, HttpFetcher};
use crate::models::{Config, RunMeta, RunResult, Source};
use crate::pipeline::diff;
use crate::signature::{self, ChangeClass};

/// Change-detection pipeline over a fetcher and a cache store.
pub struct Pipeline {
    pub(crate) fetcher: Arc<dyn Fetch>,
    pub(crate) cache: Arc<dyn CacheStore>,
    pub(crate) extractor: Extractor,
    pub(crate) config: Config,
}

impl Pipeline {
    /// Build a pipeline over explicit fetcher and cache implementations.
    pub fn new(config: Config, fetcher: Arc<dyn Fetch>, cache: Arc<dyn CacheStore>) -> Self {
        let extractor = Extractor::new(config.extraction.clone());
        Self {
            fetcher,
            cache,
            extractor,
            config,
        }
    }

    /// Build a pipeline with the HTTP fetcher and a filesystem cache rooted
    /// at `cache_dir`.
    pub fn with_defaults(config: Config, cache_dir: impl AsRef<Path>) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.fetcher)?);
        let cache = Arc::new(FsCacheStore::new(cache_dir.as_ref()));
        Ok(Self::new(config, fetcher, cache))
    }

    /// Run the full pipeline for one source.
    pub async fn run_one(&self, source: &Source) -> Result<RunResult> {
        // A failed cache read is recoverable: the run proceeds as first-seen
        // and the next successful save heals the record.
        let cached = match self.cache.load(&source.id).await {
            Ok(record) => record,
            Err(e) => {
                log::warn!(
                    "cache read failed for {}: {e}; treating as first-seen",
                    source.id
                );
                None
            }
        };

        let validators = cached
            .as_ref()
            .map(|r| &r.hints)
            .filter(|h| h.has_validators());
        let outcome = self.fetcher.fetch(source, validators).await?;

        let fetched = match outcome {
            FetchOutcome::NotModified { fetched_at } => {
                // Unchanged without a body: skip extraction and signature
                // work entirely, refresh only the timestamp.
                if let Err(e) = self.cache.touch(&source.id, fetched_at).await {
                    log::warn!("cache touch failed for {}: {e}", source.id);
                }
                let signature = cached
                    .as_ref()
                    .map(|r| r.signature.clone())
                    .unwrap_or_default();
                return Ok(RunResult {
                    url: source.url.clone(),
                    updated: false,
                    diff_summary: "No change".to_string(),
                    new_content: String::new(),
                    old_content: String::new(),
                    meta: RunMeta {
                        content_type: source.resolved_kind(),
                        selector_used: None,
                        signature,
                        fetched_at,
                        warning: None,
                        cache_persisted: true,
                    },
                });
            }
            FetchOutcome::Fetched(fetched) => fetched,
        };

        let extracted = self.extractor.extract(&fetched, source)?;
        let new_signature = signature::compute(&fetched, &extracted);
        let class = signature::classify(
            &new_signature,
            cached.as_ref().map(|r| r.signature.as_str()),
        );

        let old_content = cached.map(|r| r.content).unwrap_or_default();
        let diff_summary = diff::summarize(class, &old_content, &extracted.text);

        let record = CacheRecord::new(
            new_signature.clone(),
            &extracted.text,
            self.config.extraction.max_content_chars,
            fetched.hints.clone(),
            fetched.fetched_at,
        );
        // Losing one cache write must not be conflated with losing the
        // fetch; the result is still returned, flagged as not persisted.
        let cache_persisted = match self.cache.save(&source.id, &record).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("cache write failed for {}: {e}", source.id);
                false
            }
        };

        Ok(RunResult {
            url: source.url.clone(),
            updated: class != ChangeClass::Unchanged,
            diff_summary,
            new_content: extracted.text,
            old_content,
            meta: RunMeta {
                content_type: extracted.kind,
                selector_used: extracted.selector_used,
                signature: new_signature,
                fetched_at: fetched.fetched_at,
                warning: extracted.warning,
                cache_persisted,
            },
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::fetch::TransportHints;
    use chrono::Utc;
    use tempfile::TempDir;

    fn pipeline_with(
        tmp: &TempDir,
        outcomes: Vec<Result<FetchOutcome>>,
    ) -> (Pipeline, Arc<ScriptedFetcher>) {
        let fetcher = Arc::new(ScriptedFetcher::new(outcomes));
        let cache = Arc::new(FsCacheStore::new(tmp.path()));
        let pipeline = Pipeline::new(Config::default(), fetcher.clone(), cache);
        (pipeline, fetcher)
    }

    fn source() -> Source {
        let mut s = Source::from_url("https://epa.gov/npdes/al");
        s.id = "epa-npdes-al".into();
        s
    }

    #[tokio::test]
    async fn test_first_seen_is_updated_with_empty_old_content() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline_with(&tmp, vec![Ok(html_outcome("Permit list A"))]);

        let result = pipeline.run_one(&source()).await.unwrap();
        assert!(result.updated);
        assert!(result.old_content.is_empty());
        assert_eq!(result.new_content, "Permit list A");
        assert!(result.diff_summary.starts_with("First content captured"));
        assert!(result.meta.cache_persisted);
    }

    #[tokio::test]
    async fn test_second_identical_run_is_unchanged() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline_with(
            &tmp,
            vec![
                Ok(html_outcome("Permit list A")),
                Ok(html_outcome("Permit list A")),
            ],
        );

        let src = source();
        let first = pipeline.run_one(&src).await.unwrap();
        let second = pipeline.run_one(&src).await.unwrap();

        assert!(first.updated);
        assert!(!second.updated);
        assert_eq!(second.diff_summary, "No change");
        assert_eq!(second.meta.signature, first.meta.signature);
    }

    #[tokio::test]
    async fn test_changed_content_reports_old_and_new() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline_with(
            &tmp,
            vec![
                Ok(html_outcome("Permit list A")),
                Ok(html_outcome("Permit list A")),
                Ok(html_outcome("Permit list B")),
            ],
        );

        let src = source();
        let first = pipeline.run_one(&src).await.unwrap();
        let _second = pipeline.run_one(&src).await.unwrap();
        let third = pipeline.run_one(&src).await.unwrap();

        assert!(third.updated);
        assert_eq!(third.old_content, "Permit list A");
        assert_eq!(third.new_content, "Permit list B");
        assert_ne!(third.meta.signature, first.meta.signature);
    }

    #[tokio::test]
    async fn test_not_modified_short_circuits() {
        let tmp = TempDir::new().unwrap();
        let cache = Arc::new(FsCacheStore::new(tmp.path()));

        // Seed a record with validators so the conditional path is taken.
        let seeded = CacheRecord::new(
            "sha256=seeded".into(),
            "Permit list A",
            20_000,
            TransportHints {
                etag: Some("\"v1\"".into()),
                ..TransportHints::default()
            },
            Utc::now(),
        );
        cache.save("epa-npdes-al", &seeded).await.unwrap();

        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(FetchOutcome::NotModified {
            fetched_at: Utc::now(),
        })]));
        let pipeline = Pipeline::new(Config::default(), fetcher, cache.clone());

        let result = pipeline.run_one(&source()).await.unwrap();
        assert!(!result.updated);
        assert_eq!(result.diff_summary, "No change");
        assert_eq!(result.meta.signature, "sha256=seeded");

        // Cached signature and content are untouched; only the timestamp
        // may move.
        let after = cache.load("epa-npdes-al").await.unwrap().unwrap();
        assert_eq!(after.signature, "sha256=seeded");
        assert_eq!(after.content, "Permit list A");
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline_with(
            &tmp,
            vec![Err(crate::error::AppError::FetchStatus {
                url: "https://epa.gov/npdes/al".into(),
                status: 500,
            })],
        );

        let err = pipeline.run_one(&source()).await.unwrap_err();
        assert_eq!(err.phase(), "fetch");
    }

    #[tokio::test]
    async fn test_cache_write_failure_flags_result() {
        use async_trait::async_trait;
        use chrono::{DateTime, Utc};

        struct ReadOnlyStore;

        #[async_trait]
        impl CacheStore for ReadOnlyStore {
            async fn load(&self, _id: &str) -> Result<Option<CacheRecord>> {
                Ok(None)
            }
            async fn save(&self, _id: &str, _record: &CacheRecord) -> Result<()> {
                Err(crate::error::AppError::cache("disk full"))
            }
            async fn touch(&self, _id: &str, _at: DateTime<Utc>) -> Result<()> {
                Ok(())
            }
        }

        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(html_outcome("Permit list A"))]));
        let pipeline = Pipeline::new(Config::default(), fetcher, Arc::new(ReadOnlyStore));

        let result = pipeline.run_one(&source()).await.unwrap();
        assert!(result.updated);
        assert!(!result.meta.cache_persisted);
    }
}
