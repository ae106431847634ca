//! Job store contract and backends
//!
//! The ingestion core only needs an existence check, an insert and two
//! counts. The check-then-insert pair is not transactional; it relies on runs
//! never overlapping.

mod memory;
#[cfg(feature = "database")]
mod postgres;

use async_trait::async_trait;
use jobfeed_common::NewJobPosting;
use thiserror::Error;

pub use memory::InMemoryJobStore;
#[cfg(feature = "database")]
pub use postgres::PgJobStore;

/// Errors raised by a job store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("A posting with url {0} already exists")]
    DuplicateUrl(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "database")]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence used by the ingestion core
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Whether a posting with this exact url exists
    async fn exists_by_url(&self, url: &str) -> StoreResult<bool>;

    /// Insert a posting and return its id
    async fn save(&self, posting: NewJobPosting) -> StoreResult<i64>;

    /// Number of postings from a source, matching the name case-insensitively
    async fn count_by_source(&self, source: &str) -> StoreResult<u64>;

    /// Total number of postings
    async fn count(&self) -> StoreResult<u64>;
}
