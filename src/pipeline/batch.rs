// src/pipeline/batch.rs

//! Concurrent batch orchestration.
//!
//! Sources run on a bounded worker pool. Each source is attempted at most
//! once per batch, failures are isolated into per-source error entries, and
//! transient transport failures get a small bounded number of retries with
//! backoff. Cancelling a batch stops dispatching new sources while in-flight
//! work completes naturally.

use std::collections::HashSet;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{BatchReport, RunError, RunOutcome, RunResult, Source};
use crate::pipeline::Pipeline;

impl Pipeline {
    /// Run a batch to completion without external cancellation.
    pub async fn run_batch<F>(&self, sources: &[Source], filter: F) -> BatchReport
    where
        F: Fn(&Source) -> bool,
    {
        self.run_batch_with_cancel(sources, filter, &CancellationToken::new())
            .await
    }

    /// Run the pipeline over every active source passing `filter`.
    ///
    /// Results preserve source iteration order. The report's counts always
    /// satisfy `attempted == succeeded + errored`.
    pub async fn run_batch_with_cancel<F>(
        &self,
        sources: &[Source],
        filter: F,
        cancel: &CancellationToken,
    ) -> BatchReport
    where
        F: Fn(&Source) -> bool,
    {
        // Dedupe by id so no source runs twice within one invocation.
        let mut seen = HashSet::new();
        let selected: Vec<&Source> = sources
            .iter()
            .filter(|s| s.active && filter(s))
            .filter(|s| seen.insert(s.id.as_str()))
            .collect();

        let concurrency = self.config.batch.max_concurrent.max(1);
        let delay = Duration::from_millis(self.config.batch.request_delay_ms);

        log::info!(
            "Running batch of {} source(s) with {} worker(s)",
            selected.len(),
            concurrency
        );

        let mut outcomes = Vec::new();
        let mut skipped = 0usize;

        let mut results = stream::iter(selected)
            .map(|source| {
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        log::debug!("batch cancelled; skipping {}", source.id);
                        return (source, None);
                    }
                    (source, Some(self.run_one_with_retry(source).await))
                }
            })
            .buffered(concurrency);

        while let Some((source, result)) = results.next().await {
            match result {
                None => skipped += 1,
                Some(Ok(run)) => outcomes.push(RunOutcome::Ok(run)),
                Some(Err(e)) => {
                    log::warn!("source {} failed: {e}", source.id);
                    outcomes.push(RunOutcome::Error(RunError {
                        source_id: source.id.clone(),
                        url: source.url.clone(),
                        phase: e.phase().to_string(),
                        message: e.to_string(),
                    }));
                }
            }

            if delay.as_millis() > 0 {
                tokio::time::sleep(delay).await;
            }
        }

        let report = BatchReport::from_outcomes(outcomes, skipped);
        log::info!(
            "Batch done: attempted={} updated={} errored={} skipped={}",
            report.attempted,
            report.updated,
            report.errored,
            report.skipped
        );
        report
    }

    /// Retry transient transport failures with exponential backoff.
    /// Non-transient errors (4xx, unparseable content) fail immediately.
    async fn run_one_with_retry(&self, source: &Source) -> Result<RunResult> {
        let max_retries = self.config.batch.max_retries;
        let mut attempt = 0u32;
        loop {
            match self.run_one(source).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempt < max_retries => {
                    attempt += 1;
                    let backoff = self
                        .config
                        .batch
                        .retry_backoff_ms
                        .saturating_mul(1 << (attempt - 1));
                    log::warn!(
                        "transient failure for {} (attempt {attempt}/{max_retries}): {e}; retrying in {backoff}ms",
                        source.id
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use crate::cache::FsCacheStore;
    use crate::error::AppError;
    use crate::fetch::{Fetch, FetchOutcome, TransportHints};
    use crate::models::{Config, Source};
    use crate::pipeline::Pipeline;
    use crate::pipeline::run::testing::{ScriptedFetcher, html_outcome};
    use tempfile::TempDir;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.batch.max_concurrent = 1;
        config.batch.request_delay_ms = 0;
        config.batch.retry_backoff_ms = 1;
        config
    }

    fn sources(ids: &[&str]) -> Vec<Source> {
        ids.iter()
            .map(|id| {
                let mut s = Source::from_url(format!("https://example.gov/{id}"));
                s.id = (*id).to_string();
                s
            })
            .collect()
    }

    fn status_err(status: u16) -> crate::error::Result<FetchOutcome> {
        Err(AppError::FetchStatus {
            url: "https://example.gov/x".into(),
            status,
        })
    }

    fn pipeline(tmp: &TempDir, fetcher: Arc<dyn Fetch>) -> Pipeline {
        Pipeline::new(test_config(), fetcher, Arc::new(FsCacheStore::new(tmp.path())))
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_siblings() {
        let tmp = TempDir::new().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(html_outcome("alpha content")),
            status_err(404),
            Ok(html_outcome("gamma content")),
        ]));
        let p = pipeline(&tmp, fetcher);

        let report = p.run_batch(&sources(&["a", "b", "c"]), |_| true).await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.errored, 1);
        assert!(report.is_consistent());

        // Order preserved; the failing source sits in the middle.
        let err = report.outcomes[1].as_error().unwrap();
        assert_eq!(err.source_id, "b");
        assert_eq!(err.phase, "fetch");
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let tmp = TempDir::new().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            status_err(503),
            Ok(html_outcome("recovered")),
        ]));
        let p = pipeline(&tmp, fetcher.clone());

        let report = p.run_batch(&sources(&["a"]), |_| true).await;

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.errored, 0);
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let tmp = TempDir::new().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![status_err(404)]));
        let p = pipeline(&tmp, fetcher.clone());

        let report = p.run_batch(&sources(&["a"]), |_| true).await;

        assert_eq!(report.errored, 1);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_ids_attempted_once() {
        let tmp = TempDir::new().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(html_outcome("only once"))]));
        let p = pipeline(&tmp, fetcher.clone());

        let mut list = sources(&["a"]);
        list.push(list[0].clone());

        let report = p.run_batch(&list, |_| true).await;
        assert_eq!(report.attempted, 1);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_inactive_and_filtered_sources_excluded() {
        let tmp = TempDir::new().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(html_outcome("texas"))]));
        let p = pipeline(&tmp, fetcher);

        let mut list = sources(&["tx", "ca", "inactive"]);
        list[0].jurisdiction = Some("tx".into());
        list[1].jurisdiction = Some("ca".into());
        list[2].active = false;

        let report = p
            .run_batch(&list, |s| s.jurisdiction.as_deref() == Some("tx"))
            .await;

        assert_eq!(report.attempted, 1);
        assert_eq!(report.outcomes.len(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_dispatch_but_finishes_in_flight() {
        struct CancelOnFirstFetch {
            token: CancellationToken,
            inner: ScriptedFetcher,
        }

        #[async_trait]
        impl Fetch for CancelOnFirstFetch {
            async fn fetch(
                &self,
                source: &Source,
                cached: Option<&TransportHints>,
            ) -> crate::error::Result<FetchOutcome> {
                self.token.cancel();
                self.inner.fetch(source, cached).await
            }
        }

        let tmp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        let fetcher = Arc::new(CancelOnFirstFetch {
            token: token.clone(),
            inner: ScriptedFetcher::new(vec![Ok(html_outcome("in flight"))]),
        });
        let p = pipeline(&tmp, fetcher);

        let report = p
            .run_batch_with_cancel(&sources(&["a", "b", "c"]), |_| true, &token)
            .await;

        // The in-flight source completes; the rest are never dispatched.
        assert_eq!(report.attempted, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, 2);
        assert!(report.is_consistent());
    }

    #[tokio::test]
    async fn test_already_cancelled_batch_attempts_nothing() {
        let tmp = TempDir::new().unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![]));
        let p = pipeline(&tmp, fetcher.clone());

        let token = CancellationToken::new();
        token.cancel();

        let report = p
            .run_batch_with_cancel(&sources(&["a", "b"]), |_| true, &token)
            .await;

        assert_eq!(report.attempted, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(fetcher.call_count(), 0);
    }
}
