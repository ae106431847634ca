//! JobFeed Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Pulls remote-job postings from external sources, normalizes them into a
//! common record shape, drops incomplete entries and duplicates, and persists
//! the rest through a [`store::JobStore`].
//!
//! # Modules
//!
//! - **sources**: per-format adapters (RSS, prefixed JSON array, wrapped JSON object)
//! - **validator**: completeness checks on candidate records
//! - **store**: persistence contract plus in-memory and PostgreSQL backends
//! - **retry**: bounded retry with linear backoff and cancellation
//! - **coordinator**: one ingestion run over all sources
//! - **scheduler**: startup run plus fixed-interval runs
//! - **config**: environment-driven settings
//!
//! # Example
//!
//! ```no_run
//! use jobfeed_ingest::{
//!     build_adapter, default_sources, HttpFetcher, HttpSettings, InMemoryJobStore,
//!     RetryExecutor, RetryPolicy, RunCoordinator,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fetcher = HttpFetcher::new(&HttpSettings::default())?;
//!     let adapters = default_sources()
//!         .into_iter()
//!         .map(|source| build_adapter(source, fetcher.clone()))
//!         .collect();
//!
//!     let coordinator = RunCoordinator::new(
//!         adapters,
//!         Arc::new(InMemoryJobStore::new()),
//!         RetryExecutor::new(RetryPolicy::default(), CancellationToken::new()),
//!     );
//!
//!     let stats = coordinator.run_once().await;
//!     println!("{} new jobs", stats.new_jobs_total);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod retry;
pub mod scheduler;
pub mod sources;
pub mod store;
pub mod validator;

pub use config::IngestConfig;
pub use coordinator::{RunCoordinator, RunStats, SourceReport, SourceStatus, SourceTally};
pub use error::{IngestError, Result};
pub use retry::{RetryExecutor, RetryOutcome, RetryPolicy};
pub use scheduler::{run_scheduled, JobScheduler};
pub use sources::{
    build_adapter, default_sources, HttpFetcher, HttpSettings, SourceAdapter, SourceConfig,
    WireFormat,
};
pub use store::{InMemoryJobStore, JobStore, StoreError};
#[cfg(feature = "database")]
pub use store::PgJobStore;
