//! The four typed job queues sharing one durable store.

use std::sync::Arc;

use s3browser_core::result::AppResult;
use s3browser_entity::job::{DeleteJob, FetchJob, JobKind, PublishJob, UnpublishJob};
use s3browser_store::DurableStore;

use crate::queue::{GenericQueue, QueueStats};

/// One queue per job kind over a shared store.
#[derive(Debug, Clone)]
pub struct JobQueues {
    /// Remote fetch-and-store jobs
    pub fetch: GenericQueue<FetchJob>,
    /// Make-public jobs
    pub publish: GenericQueue<PublishJob>,
    /// Make-private jobs
    pub unpublish: GenericQueue<UnpublishJob>,
    /// Delete jobs
    pub delete: GenericQueue<DeleteJob>,
}

impl JobQueues {
    /// Partition names the store must be opened with.
    pub fn partitions() -> Vec<&'static str> {
        JobKind::partitions()
    }

    /// Bind every queue to its partition of `store`.
    pub fn open(store: Arc<DurableStore>) -> AppResult<Self> {
        Ok(Self {
            fetch: GenericQueue::new(Arc::clone(&store))?,
            publish: GenericQueue::new(Arc::clone(&store))?,
            unpublish: GenericQueue::new(Arc::clone(&store))?,
            delete: GenericQueue::new(store)?,
        })
    }

    /// Item counts for every kind, in scheduling order.
    pub async fn stats(&self) -> AppResult<Vec<(JobKind, QueueStats)>> {
        Ok(vec![
            (JobKind::Fetch, self.fetch.stats().await?),
            (JobKind::Publish, self.publish.stats().await?),
            (JobKind::Unpublish, self.unpublish.stats().await?),
            (JobKind::Delete, self.delete.stats().await?),
        ])
    }
}
