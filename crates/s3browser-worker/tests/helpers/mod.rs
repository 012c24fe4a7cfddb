//! Shared fixtures for worker integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use s3browser_core::config::StoreConfig;
use s3browser_core::error::AppError;
use s3browser_core::result::AppResult;
use s3browser_core::traits::ObjectStore;
use s3browser_store::DurableStore;
use s3browser_worker::JobQueues;

/// Which collaborator operation was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    FetchAndStore,
    MakePublic,
    MakePrivate,
    Delete,
}

/// Scriptable in-memory object store.
#[derive(Debug, Default)]
pub struct MockObjectStore {
    failing: Mutex<HashSet<String>>,
    latency: Duration,
    calls: Mutex<Vec<(Op, String)>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` before answering.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Make every call addressing `key` fail.
    pub fn fail_on(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    pub fn calls(&self) -> Vec<(Op, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of calls observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn call(&self, op: Op, key: &str) -> AppResult<()> {
        self.calls.lock().unwrap().push((op, key.to_string()));
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(key) {
            return Err(AppError::storage(format!("scripted failure for '{key}'")));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    fn provider_type(&self) -> &str {
        "mock"
    }

    async fn fetch_and_store(&self, _source_url: &str, key: &str) -> AppResult<()> {
        self.call(Op::FetchAndStore, key).await
    }

    async fn make_public(&self, key: &str) -> AppResult<()> {
        self.call(Op::MakePublic, key).await
    }

    async fn make_private(&self, key: &str) -> AppResult<()> {
        self.call(Op::MakePrivate, key).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.call(Op::Delete, key).await
    }
}

/// A fresh store with all job partitions, living in a temp directory.
pub struct TestEnv {
    pub dir: TempDir,
    pub store: Arc<DurableStore>,
    pub queues: JobQueues,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::at(dir.path().to_string_lossy());
        let store = Arc::new(DurableStore::open(&config, &JobQueues::partitions()).unwrap());
        let queues = JobQueues::open(Arc::clone(&store)).unwrap();
        Self { dir, store, queues }
    }
}
