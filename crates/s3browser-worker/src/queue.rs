//! Generic job queue over one partition of the durable store.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use s3browser_core::error::AppError;
use s3browser_core::result::AppResult;
use s3browser_core::types::JobId;
use s3browser_entity::job::{JobStatus, QueueItem};
use s3browser_store::{DurableStore, WriteTxn};

/// Per-status item counts for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// All readable items.
    pub total: usize,
    /// Items waiting to be claimed.
    pub pending: usize,
    /// Items claimed by a batch and not yet finished.
    pub processing: usize,
    /// Items whose side effect succeeded.
    pub succeeded: usize,
    /// Items whose side effect failed.
    pub failed: usize,
}

impl QueueStats {
    /// Items in a terminal status.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    fn record(&mut self, status: JobStatus) {
        self.total += 1;
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Processing => self.processing += 1,
            JobStatus::Success => self.succeeded += 1,
            JobStatus::Failed => self.failed += 1,
        }
    }
}

/// Durable queue of `T` records, keyed by [`JobId`] in one partition.
///
/// Every operation runs in a single store transaction on the blocking
/// thread pool. Records that fail to deserialize are logged and skipped
/// by scans; point lookups report them as serialization errors.
pub struct GenericQueue<T: QueueItem> {
    /// Shared store handle
    store: Arc<DurableStore>,
    /// Partition holding this queue's records
    partition: Arc<str>,
    _item: PhantomData<fn() -> T>,
}

impl<T: QueueItem> Clone for GenericQueue<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            partition: Arc::clone(&self.partition),
            _item: PhantomData,
        }
    }
}

impl<T: QueueItem> std::fmt::Debug for GenericQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericQueue")
            .field("kind", &T::KIND)
            .field("partition", &self.partition)
            .finish()
    }
}

impl<T: QueueItem> GenericQueue<T> {
    /// Create the queue bound to `T`'s partition.
    pub fn new(store: Arc<DurableStore>) -> AppResult<Self> {
        Self::with_partition(store, T::KIND.partition())
    }

    /// Create a queue of `T` bound to an explicit partition.
    pub fn with_partition(store: Arc<DurableStore>, partition: &str) -> AppResult<Self> {
        if !store.has_partition(partition) {
            return Err(AppError::partition_not_found(partition));
        }
        Ok(Self {
            store,
            partition: Arc::from(partition),
            _item: PhantomData,
        })
    }

    /// Partition name.
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Run `f` against the store on the blocking pool.
    async fn blocking<R, F>(&self, op: &'static str, f: F) -> AppResult<R>
    where
        F: FnOnce(&DurableStore, &str) -> AppResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let partition = Arc::clone(&self.partition);
        tokio::task::spawn_blocking(move || f(&*store, &*partition))
            .await
            .map_err(|e| AppError::internal(format!("Queue {op} task failed: {e}")))?
    }

    /// Enqueue `item` as `Pending` under a freshly assigned identity.
    ///
    /// Returns the stored item with its identity filled in.
    pub async fn push(&self, mut item: T) -> AppResult<T> {
        self.blocking("push", move |store, partition| {
            store.with_write(partition, |txn| {
                let mut id = JobId::generate();
                while txn.contains(id.as_str())? {
                    id = JobId::generate();
                }
                item.set_id(id);
                item.set_status(JobStatus::Pending);
                put_item(txn, item.id().as_str(), &item)?;

                tracing::debug!(
                    "Pushed job: id={}, partition='{}', {}",
                    item.id(),
                    partition,
                    item.describe()
                );
                Ok(item)
            })
        })
        .await
    }

    /// Claim up to `max` pending items in key order, marking them
    /// `Processing`.
    ///
    /// The scan and every status flip happen in one write transaction, so
    /// concurrent claimers never receive the same item.
    pub async fn claim_batch(&self, max: usize) -> AppResult<Vec<T>> {
        if max == 0 {
            return Ok(Vec::new());
        }

        self.blocking("claim", move |store, partition| {
            store.with_write(partition, |txn| {
                let mut claimed: Vec<(String, T)> = Vec::with_capacity(max);
                for entry in txn.iter()? {
                    let (key, raw) = entry?;
                    match serde_json::from_slice::<T>(raw) {
                        Ok(item) if item.status() == JobStatus::Pending => {
                            claimed.push((key.to_string(), item));
                            if claimed.len() == max {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => skip_unreadable(partition, key, &e),
                    }
                }

                let mut items = Vec::with_capacity(claimed.len());
                for (key, mut item) in claimed {
                    item.set_status(JobStatus::Processing);
                    put_item(txn, &key, &item)?;
                    items.push(item);
                }
                Ok(items)
            })
        })
        .await
    }

    /// Claim a single pending item.
    pub async fn pop(&self) -> AppResult<Option<T>> {
        Ok(self.claim_batch(1).await?.into_iter().next())
    }

    /// Overwrite the status of the item with `id`.
    ///
    /// Any transition is accepted; this is also the external path for
    /// resetting an item back to `Pending`.
    pub async fn update_status(&self, id: &JobId, status: JobStatus) -> AppResult<T> {
        let id = id.clone();
        self.blocking("update", move |store, partition| {
            store.with_write(partition, |txn| {
                let raw = txn
                    .get(id.as_str())?
                    .ok_or_else(|| item_not_found(partition, &id))?;
                let mut item: T = serde_json::from_slice(raw)?;
                item.set_status(status);
                put_item(txn, id.as_str(), &item)?;
                Ok(item)
            })
        })
        .await
    }

    /// Reset every `Processing` item to `Pending`; returns their identities.
    pub async fn requeue_processing(&self) -> AppResult<Vec<JobId>> {
        self.blocking("requeue", |store, partition| {
            store.with_write(partition, |txn| {
                let mut stuck: Vec<(String, T)> = Vec::new();
                for entry in txn.iter()? {
                    let (key, raw) = entry?;
                    match serde_json::from_slice::<T>(raw) {
                        Ok(item) if item.status() == JobStatus::Processing => {
                            stuck.push((key.to_string(), item));
                        }
                        Ok(_) => {}
                        Err(e) => skip_unreadable(partition, key, &e),
                    }
                }

                let mut ids = Vec::with_capacity(stuck.len());
                for (key, mut item) in stuck {
                    item.set_status(JobStatus::Pending);
                    put_item(txn, &key, &item)?;
                    ids.push(item.id().clone());
                }
                Ok(ids)
            })
        })
        .await
    }

    /// Every readable item regardless of status, in key order.
    pub async fn all(&self) -> AppResult<Vec<T>> {
        self.blocking("scan", |store, partition| {
            store.with_read(partition, |txn| {
                let mut items = Vec::new();
                for entry in txn.iter()? {
                    let (key, raw) = entry?;
                    match serde_json::from_slice::<T>(raw) {
                        Ok(item) => items.push(item),
                        Err(e) => skip_unreadable(partition, key, &e),
                    }
                }
                Ok(items)
            })
        })
        .await
    }

    /// Point lookup.
    pub async fn get(&self, id: &JobId) -> AppResult<T> {
        let id = id.clone();
        self.blocking("get", move |store, partition| {
            store.with_read(partition, |txn| {
                let raw = txn
                    .get(id.as_str())?
                    .ok_or_else(|| item_not_found(partition, &id))?;
                Ok(serde_json::from_slice::<T>(raw)?)
            })
        })
        .await
    }

    /// Delete every item in the partition.
    pub async fn clear(&self) -> AppResult<()> {
        self.blocking("clear", |store, partition| {
            store.with_write(partition, |txn| txn.clear())?;
            tracing::info!("Cleared queue partition '{}'", partition);
            Ok(())
        })
        .await
    }

    /// Number of `Pending` items.
    pub async fn pending_count(&self) -> AppResult<usize> {
        Ok(self.stats().await?.pending)
    }

    /// Item counts by status.
    pub async fn stats(&self) -> AppResult<QueueStats> {
        self.blocking("stats", |store, partition| {
            store.with_read(partition, |txn| {
                let mut stats = QueueStats::default();
                for entry in txn.iter()? {
                    let (key, raw) = entry?;
                    match serde_json::from_slice::<T>(raw) {
                        Ok(item) => stats.record(item.status()),
                        Err(e) => skip_unreadable(partition, key, &e),
                    }
                }
                Ok(stats)
            })
        })
        .await
    }
}

fn put_item<T: QueueItem>(txn: &mut WriteTxn<'_>, key: &str, item: &T) -> AppResult<()> {
    let bytes = serde_json::to_vec(item)?;
    txn.put(key, &bytes)
}

fn item_not_found(partition: &str, id: &JobId) -> AppError {
    AppError::not_found(format!("Job '{id}' not found in '{partition}'"))
}

fn skip_unreadable(partition: &str, key: &str, err: &serde_json::Error) {
    tracing::warn!(
        "Skipping unreadable record: partition='{}', key='{}', error={}",
        partition,
        key,
        err
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3browser_core::config::StoreConfig;
    use s3browser_core::error::ErrorKind;
    use s3browser_entity::job::{DeleteJob, FetchJob, JobKind, PublishJob};

    fn open_store(dir: &tempfile::TempDir) -> Arc<DurableStore> {
        let config = StoreConfig::at(dir.path().to_string_lossy());
        Arc::new(DurableStore::open(&config, &JobKind::partitions()).unwrap())
    }

    fn fetch(n: usize) -> FetchJob {
        FetchJob::new(
            format!("https://example.com/{n}.bin"),
            format!("{n}.bin"),
            "incoming",
        )
    }

    #[tokio::test]
    async fn test_push_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let queue = GenericQueue::<FetchJob>::new(open_store(&dir)).unwrap();

        let pushed = queue.push(fetch(1)).await.unwrap();
        assert!(!pushed.id().is_empty());
        assert_eq!(pushed.status(), JobStatus::Pending);

        let stored = queue.get(pushed.id()).await.unwrap();
        assert_eq!(stored, pushed);
        assert_eq!(stored.remote_url, "https://example.com/1.bin");
        assert_eq!(stored.target_folder, "incoming");
    }

    #[tokio::test]
    async fn test_push_overrides_status() {
        let dir = tempfile::tempdir().unwrap();
        let queue = GenericQueue::<PublishJob>::new(open_store(&dir)).unwrap();

        let mut job = PublishJob::new("a.txt", "a.txt");
        job.set_status(JobStatus::Success);
        let pushed = queue.push(job).await.unwrap();
        assert_eq!(pushed.status(), JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_claim_bounds_and_no_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let queue = GenericQueue::<FetchJob>::new(open_store(&dir)).unwrap();
        for n in 0..5 {
            queue.push(fetch(n)).await.unwrap();
        }

        let first = queue.claim_batch(3).await.unwrap();
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|j| j.status() == JobStatus::Processing));
        for job in &first {
            assert_eq!(
                queue.get(job.id()).await.unwrap().status(),
                JobStatus::Processing
            );
        }

        let second = queue.claim_batch(3).await.unwrap();
        assert_eq!(second.len(), 2);
        assert!(second.iter().all(|j| !first.iter().any(|f| f.id() == j.id())));

        assert!(queue.claim_batch(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_claim_zero_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let queue = GenericQueue::<FetchJob>::new(open_store(&dir)).unwrap();
        queue.push(fetch(0)).await.unwrap();

        assert!(queue.claim_batch(0).await.unwrap().is_empty());
        assert_eq!(queue.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_claim_skips_non_pending() {
        let dir = tempfile::tempdir().unwrap();
        let queue = GenericQueue::<FetchJob>::new(open_store(&dir)).unwrap();
        let a = queue.push(fetch(0)).await.unwrap();
        let b = queue.push(fetch(1)).await.unwrap();
        queue.update_status(a.id(), JobStatus::Failed).await.unwrap();

        let claimed = queue.claim_batch(5).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id(), b.id());
        assert_eq!(queue.get(a.id()).await.unwrap().status(), JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_pop() {
        let dir = tempfile::tempdir().unwrap();
        let queue = GenericQueue::<DeleteJob>::new(open_store(&dir)).unwrap();
        assert!(queue.pop().await.unwrap().is_none());

        let pushed = queue.push(DeleteJob::new("old/", "old")).await.unwrap();
        let popped = queue.pop().await.unwrap().unwrap();
        assert_eq!(popped.id(), pushed.id());
        assert_eq!(popped.status(), JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_update_status_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let queue = GenericQueue::<FetchJob>::new(open_store(&dir)).unwrap();
        let err = queue
            .update_status(&JobId::from("missing"), JobStatus::Failed)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = queue.get(&JobId::from("missing")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_reset_makes_item_claimable_again() {
        let dir = tempfile::tempdir().unwrap();
        let queue = GenericQueue::<FetchJob>::new(open_store(&dir)).unwrap();
        let job = queue.push(fetch(0)).await.unwrap();
        queue.claim_batch(1).await.unwrap();
        queue.update_status(job.id(), JobStatus::Failed).await.unwrap();
        assert!(queue.claim_batch(1).await.unwrap().is_empty());

        queue.update_status(job.id(), JobStatus::Pending).await.unwrap();
        let again = queue.claim_batch(1).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].id(), job.id());
    }

    #[tokio::test]
    async fn test_requeue_processing() {
        let dir = tempfile::tempdir().unwrap();
        let queue = GenericQueue::<FetchJob>::new(open_store(&dir)).unwrap();
        for n in 0..3 {
            queue.push(fetch(n)).await.unwrap();
        }
        let claimed = queue.claim_batch(2).await.unwrap();
        queue
            .update_status(claimed[0].id(), JobStatus::Success)
            .await
            .unwrap();

        let requeued = queue.requeue_processing().await.unwrap();
        assert_eq!(requeued, vec![claimed[1].id().clone()]);
        assert_eq!(queue.pending_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_leaves_other_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let fetches = GenericQueue::<FetchJob>::new(Arc::clone(&store)).unwrap();
        let deletes = GenericQueue::<DeleteJob>::new(store).unwrap();
        fetches.push(fetch(0)).await.unwrap();
        deletes.push(DeleteJob::new("a.txt", "a.txt")).await.unwrap();

        fetches.clear().await.unwrap();
        assert!(fetches.all().await.unwrap().is_empty());
        assert_eq!(deletes.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let dir = tempfile::tempdir().unwrap();
        let queue = GenericQueue::<FetchJob>::new(open_store(&dir)).unwrap();
        let mut ids = Vec::new();
        for n in 0..4 {
            ids.push(queue.push(fetch(n)).await.unwrap().id().clone());
        }
        queue.claim_batch(3).await.unwrap();
        queue.update_status(&ids[0], JobStatus::Success).await.unwrap();
        queue.update_status(&ids[1], JobStatus::Failed).await.unwrap();

        let stats = queue.stats().await.unwrap();
        assert_eq!(
            stats,
            QueueStats {
                total: 4,
                pending: 1,
                processing: 1,
                succeeded: 1,
                failed: 1,
            }
        );
        assert_eq!(stats.completed(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let queue = GenericQueue::<FetchJob>::new(Arc::clone(&store)).unwrap();
        let good = queue.push(fetch(0)).await.unwrap();
        store
            .with_write(JobKind::Fetch.partition(), |txn| {
                txn.put("00000000000000-corrupt", b"{not json")
            })
            .unwrap();

        let all = queue.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(queue.stats().await.unwrap().total, 1);

        let claimed = queue.claim_batch(5).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id(), good.id());

        let err = queue
            .get(&JobId::from("00000000000000-corrupt"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }

    #[tokio::test]
    async fn test_unknown_partition_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = GenericQueue::<FetchJob>::with_partition(open_store(&dir), "queue_other")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PartitionNotFound);
    }
}
