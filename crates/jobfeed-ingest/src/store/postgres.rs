//! PostgreSQL job store (feature `database`)

use async_trait::async_trait;
use jobfeed_common::NewJobPosting;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use super::{JobStore, StoreError, StoreResult};

/// Seconds to wait for a pooled connection
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Job store backed by the `job_postings` table
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Connect a new pool
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Job store migrations applied");
        Ok(())
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn exists_by_url(&self, url: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM job_postings WHERE url = $1)",
        )
        .bind(url)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn save(&self, posting: NewJobPosting) -> StoreResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO job_postings (title, company, url, source, job_type)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (url) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.url)
        .bind(&posting.source)
        .bind(&posting.job_type)
        .fetch_optional(&self.pool)
        .await?;

        id.ok_or(StoreError::DuplicateUrl(posting.url))
    }

    async fn count_by_source(&self, source: &str) -> StoreResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM job_postings WHERE LOWER(source) = LOWER($1)",
        )
        .bind(source)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn count(&self) -> StoreResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM job_postings")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}
