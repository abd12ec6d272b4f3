//! Per-source and aggregate run results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ContentKind;

/// Metadata attached to every run result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    /// Payload kind actually processed
    pub content_type: ContentKind,

    /// Selector or strategy the extractor used
    pub selector_used: Option<String>,

    /// Signature computed for this fetch
    pub signature: String,

    /// When the fetch completed
    pub fetched_at: DateTime<Utc>,

    /// Extraction warning (e.g. empty PDF text), not an error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,

    /// False when the cache write failed; the result itself is still valid
    pub cache_persisted: bool,
}

/// Outcome of one pipeline execution for one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub url: String,

    /// True exactly when the new signature differs from the cached one,
    /// including the first-seen case
    pub updated: bool,

    /// Short human-readable change summary
    pub diff_summary: String,

    /// Newly extracted content (empty on a 304 short-circuit)
    pub new_content: String,

    /// Previously cached content (empty for first-seen sources)
    pub old_content: String,

    pub meta: RunMeta,
}

/// Per-source failure entry in a batch report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    pub source_id: String,
    pub url: String,

    /// Pipeline phase that failed: fetch, extract, signature, cache, other
    pub phase: String,

    pub message: String,
}

/// One entry of a batch report, in source iteration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    Ok(RunResult),
    Error(RunError),
}

impl RunOutcome {
    pub fn as_result(&self) -> Option<&RunResult> {
        match self {
            RunOutcome::Ok(r) => Some(r),
            RunOutcome::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&RunError> {
        match self {
            RunOutcome::Ok(_) => None,
            RunOutcome::Error(e) => Some(e),
        }
    }
}

/// Aggregate outcome of running many sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Sources dispatched to the pipeline
    pub attempted: usize,

    /// Completed runs, updated or not
    pub succeeded: usize,

    /// Completed runs with `updated == true`
    pub updated: usize,

    /// Runs converted to a `RunError`
    pub errored: usize,

    /// Sources never dispatched because the batch was cancelled
    pub skipped: usize,

    /// Per-source outcomes, preserving source iteration order
    pub outcomes: Vec<RunOutcome>,
}

impl BatchReport {
    /// Fold per-source outcomes into a report; counts stay consistent by
    /// construction.
    pub fn from_outcomes(outcomes: Vec<RunOutcome>, skipped: usize) -> Self {
        let mut report = Self {
            skipped,
            ..Self::default()
        };
        for outcome in &outcomes {
            report.attempted += 1;
            match outcome {
                RunOutcome::Ok(r) => {
                    report.succeeded += 1;
                    if r.updated {
                        report.updated += 1;
                    }
                }
                RunOutcome::Error(_) => report.errored += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }

    /// `attempted == succeeded + errored` must always hold.
    pub fn is_consistent(&self) -> bool {
        self.attempted == self.succeeded + self.errored
    }
}
