//! In-process job store

use async_trait::async_trait;
use jobfeed_common::{JobPosting, NewJobPosting};
use std::collections::HashSet;
use tokio::sync::RwLock;

use super::{JobStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Inner {
    postings: Vec<JobPosting>,
    urls: HashSet<String>,
}

/// Job store kept in memory for the lifetime of the process
///
/// Ids are assigned sequentially from 1 and urls are unique.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    inner: RwLock<Inner>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all postings in insertion order
    pub async fn postings(&self) -> Vec<JobPosting> {
        self.inner.read().await.postings.clone()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn exists_by_url(&self, url: &str) -> StoreResult<bool> {
        Ok(self.inner.read().await.urls.contains(url))
    }

    async fn save(&self, posting: NewJobPosting) -> StoreResult<i64> {
        let mut inner = self.inner.write().await;
        if inner.urls.contains(&posting.url) {
            return Err(StoreError::DuplicateUrl(posting.url));
        }

        let id = inner.postings.len() as i64 + 1;
        inner.urls.insert(posting.url.clone());
        inner.postings.push(posting.with_id(id));
        Ok(id)
    }

    async fn count_by_source(&self, source: &str) -> StoreResult<u64> {
        let inner = self.inner.read().await;
        let count = inner
            .postings
            .iter()
            .filter(|p| p.source.eq_ignore_ascii_case(source))
            .count();
        Ok(count as u64)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.inner.read().await.postings.len() as u64)
    }
}
