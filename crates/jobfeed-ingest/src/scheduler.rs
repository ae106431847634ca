//! Periodic run scheduler
//!
//! Runs the coordinator once at startup and then on a fixed interval until
//! shutdown is requested. Runs execute inline on the scheduler task, so two
//! runs never overlap; a run that outlasts the interval delays the next tick.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::coordinator::{RunCoordinator, RunStats};

/// Default pause between run starts (4 hours)
pub const DEFAULT_RUN_INTERVAL_SECS: u64 = 4 * 60 * 60;

/// Fixed-rate scheduler for ingestion runs
pub struct JobScheduler {
    coordinator: Arc<RunCoordinator>,
    interval: Duration,
}

impl JobScheduler {
    pub fn new(coordinator: Arc<RunCoordinator>, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
        }
    }

    /// Spawn the scheduler loop; the handle resolves to the number of runs
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<u64> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Drive runs until `shutdown` fires
    ///
    /// A run already in progress is allowed to finish.
    pub async fn run(self, shutdown: CancellationToken) -> u64 {
        info!(
            interval_secs = self.interval.as_secs(),
            "Job scheduler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut runs = 0;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let stats = self.coordinator.run_once().await;
            runs += 1;
            log_summary(&stats);

            if shutdown.is_cancelled() {
                break;
            }
        }

        info!(runs, "Job scheduler stopped");
        runs
    }
}

/// Run at startup, then every `interval`, until `shutdown` fires
pub async fn run_scheduled(
    coordinator: Arc<RunCoordinator>,
    interval: Duration,
    shutdown: CancellationToken,
) -> u64 {
    JobScheduler::new(coordinator, interval).run(shutdown).await
}

fn log_summary(stats: &RunStats) {
    let elapsed = stats.finished_at - stats.started_at;
    info!(
        run_id = %stats.run_id,
        new_jobs = stats.new_jobs_total,
        elapsed_ms = elapsed.num_milliseconds(),
        "Scheduled run finished"
    );
    for report in stats.failed_sources() {
        warn!(
            run_id = %stats.run_id,
            source = %report.name,
            status = ?report.status,
            attempts = report.attempts,
            "Source did not complete"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::retry::{RetryExecutor, RetryPolicy};
    use crate::sources::{ParsedBatch, SourceAdapter, SourceConfig, WireFormat};
    use crate::store::InMemoryJobStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingAdapter {
        config: SourceConfig,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl SourceAdapter for CountingAdapter {
        fn config(&self) -> &SourceConfig {
            &self.config
        }

        async fn fetch_and_parse(&self) -> Result<ParsedBatch> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ParsedBatch::empty())
        }
    }

    fn scheduler(calls: Arc<AtomicU32>, interval: Duration) -> JobScheduler {
        let adapter = CountingAdapter {
            config: SourceConfig::new(
                "RemoteOK",
                "http://localhost/api",
                WireFormat::PrefixedArray,
                "http://localhost",
            ),
            calls,
        };
        let coordinator = RunCoordinator::new(
            vec![Box::new(adapter)],
            Arc::new(InMemoryJobStore::new()),
            RetryExecutor::new(RetryPolicy::default(), CancellationToken::new()),
        );
        JobScheduler::new(Arc::new(coordinator), interval)
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_interval() {
        let calls = Arc::new(AtomicU32::new(0));
        let shutdown = CancellationToken::new();
        let handle = scheduler(calls.clone(), Duration::from_secs(3600)).start(shutdown.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        shutdown.cancel();
        assert_eq!(handle.await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_start_runs_nothing() {
        let calls = Arc::new(AtomicU32::new(0));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let runs = run_scheduled(
            scheduler(calls.clone(), Duration::from_secs(60)).coordinator,
            Duration::from_secs(60),
            shutdown,
        )
        .await;
        assert_eq!(runs, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
