//! Run coordinator
//!
//! One run walks the configured sources in order. Each source goes through
//! fetch, parse, validate and persist under the retry executor; a source
//! that fails for good is reported and the run moves on. After the last
//! source the store is re-counted for reporting.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::retry::{RetryExecutor, RetryOutcome};
use crate::sources::SourceAdapter;
use crate::store::{JobStore, StoreResult};
use crate::validator;

/// How a source ended in this run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Succeeded,
    Failed,
    Cancelled,
}

/// Per-item tallies from one successful source attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceTally {
    /// Postings inserted
    pub new_jobs: usize,
    /// Valid candidates whose url was already stored
    pub duplicates: usize,
    /// Candidates dropped by validation
    pub rejected: usize,
    /// Items the adapter could not parse
    pub malformed: usize,
    /// Existence checks or inserts that failed
    pub store_failures: usize,
}

/// Outcome of one source within a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub status: SourceStatus,
    pub attempts: u32,
    #[serde(flatten)]
    pub tally: SourceTally,
}

/// Authoritative counts read back from the store after a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreTotals {
    pub per_source: Vec<(String, u64)>,
    pub total: u64,
}

/// Statistics for one run
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    /// Postings inserted during this run
    pub new_jobs_total: usize,
    /// `None` when the recount failed
    pub store_totals: Option<StoreTotals>,
}

impl RunStats {
    pub fn source(&self, name: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources
            .iter()
            .filter(|s| s.status != SourceStatus::Succeeded)
    }
}

/// Drives one ingestion run over a fixed, ordered list of sources
pub struct RunCoordinator {
    sources: Vec<Box<dyn SourceAdapter>>,
    store: Arc<dyn JobStore>,
    executor: RetryExecutor,
}

impl RunCoordinator {
    pub fn new(
        sources: Vec<Box<dyn SourceAdapter>>,
        store: Arc<dyn JobStore>,
        executor: RetryExecutor,
    ) -> Self {
        Self {
            sources,
            store,
            executor,
        }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Run every source once, in order
    ///
    /// Never fails: per-source failures end up in the returned statistics.
    pub async fn run_once(&self) -> RunStats {
        let run_id = Uuid::new_v4();
        let span = info_span!("ingest_run", %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> RunStats {
        let started_at = Utc::now();
        info!(started_at = %started_at, sources = self.sources.len(), "Starting ingestion run");

        let mut reports = Vec::with_capacity(self.sources.len());
        let mut new_jobs_total = 0;

        for adapter in &self.sources {
            let name = adapter.name();
            let outcome = self
                .executor
                .execute(name, |_attempt| self.ingest_source(adapter.as_ref()))
                .await;

            let attempts = outcome.attempts();
            let (status, tally) = match outcome {
                RetryOutcome::Succeeded { value, .. } => (SourceStatus::Succeeded, value),
                RetryOutcome::Exhausted { .. } => (SourceStatus::Failed, SourceTally::default()),
                RetryOutcome::Cancelled { .. } => {
                    (SourceStatus::Cancelled, SourceTally::default())
                },
            };

            new_jobs_total += tally.new_jobs;
            reports.push(SourceReport {
                name: name.to_string(),
                status,
                attempts,
                tally,
            });
        }

        info!(new_jobs = new_jobs_total, "Ingestion run completed");

        let store_totals = match self.recount().await {
            Ok(totals) => {
                for (source, count) in &totals.per_source {
                    info!(source = %source, jobs = count, "Stored postings by source");
                }
                info!(jobs = totals.total, "Stored postings total");
                Some(totals)
            },
            Err(e) => {
                warn!(error = %e, "Could not generate store statistics");
                None
            },
        };

        RunStats {
            run_id,
            started_at,
            finished_at: Utc::now(),
            sources: reports,
            new_jobs_total,
            store_totals,
        }
    }

    /// Fetch, validate and persist one source
    ///
    /// Only fetch and envelope errors are returned; everything item-level is
    /// tallied.
    async fn ingest_source(&self, adapter: &dyn SourceAdapter) -> Result<SourceTally> {
        let source = adapter.name();
        let batch = adapter.fetch_and_parse().await?;

        let mut tally = SourceTally {
            malformed: batch.malformed,
            ..SourceTally::default()
        };

        for candidate in batch.records {
            if let Err(e) = validator::validate(&candidate) {
                debug!(source, url = %candidate.url, error = %e, "Skipping invalid job data");
                tally.rejected += 1;
                continue;
            }

            match self.store.exists_by_url(&candidate.url).await {
                Ok(true) => tally.duplicates += 1,
                Ok(false) => {
                    let url = candidate.url.clone();
                    match self.store.save(candidate.into_posting()).await {
                        Ok(id) => {
                            debug!(source, id, url = %url, "Stored new posting");
                            tally.new_jobs += 1;
                        },
                        Err(e) => {
                            warn!(source, url = %url, error = %e, "Failed to store posting");
                            tally.store_failures += 1;
                        },
                    }
                },
                Err(e) => {
                    warn!(source, url = %candidate.url, error = %e, "Existence check failed");
                    tally.store_failures += 1;
                },
            }
        }

        info!(
            source,
            new_jobs = tally.new_jobs,
            duplicates = tally.duplicates,
            rejected = tally.rejected,
            malformed = tally.malformed,
            "Source processed"
        );

        Ok(tally)
    }

    async fn recount(&self) -> StoreResult<StoreTotals> {
        let mut per_source = Vec::with_capacity(self.sources.len());
        for adapter in &self.sources {
            let name = adapter.name();
            per_source.push((name.to_string(), self.store.count_by_source(name).await?));
        }

        Ok(StoreTotals {
            per_source,
            total: self.store.count().await?,
        })
    }
}
