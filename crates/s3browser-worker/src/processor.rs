//! Batch processor: claims a batch from one queue and runs it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinSet;

use s3browser_core::result::AppResult;
use s3browser_entity::job::{JobStatus, QueueItem};

use crate::executor::{JobExecutionError, JobHandler};
use crate::queue::GenericQueue;
use crate::scheduler::ScheduledJob;

/// Result of one [`Processor::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A previous run still held the in-flight guard.
    Skipped,
    /// Nothing was pending.
    Idle,
    /// A batch was claimed and every item reached a terminal status.
    Completed(BatchReport),
}

/// Per-batch outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items claimed for the batch
    pub claimed: usize,
    /// Items whose side effect succeeded
    pub succeeded: usize,
    /// Items whose side effect failed or panicked
    pub failed: usize,
}

/// Holds the in-flight flag; releases it on drop.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drains one job kind's queue, one bounded batch per run.
///
/// At most one batch is in flight per processor: a run started while
/// another is still joining its batch returns [`RunOutcome::Skipped`]
/// without touching the queue.
#[derive(Debug)]
pub struct Processor<H: JobHandler> {
    /// Queue this processor drains
    queue: GenericQueue<H::Item>,
    /// Side effect per item
    handler: Arc<H>,
    /// Batch size and fan-out width
    max_concurrency: usize,
    /// Single-flight flag
    in_flight: AtomicBool,
}

impl<H: JobHandler> Processor<H> {
    /// Create a new processor
    pub fn new(queue: GenericQueue<H::Item>, handler: H, max_concurrency: usize) -> Self {
        Self {
            queue,
            handler: Arc::new(handler),
            max_concurrency: max_concurrency.max(1),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Job type name of the handler.
    pub fn name(&self) -> &str {
        self.handler.job_type()
    }

    /// Configured batch size.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Whether a batch is currently in flight.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim one batch and execute every item concurrently.
    ///
    /// Returns once every item of the batch has a terminal status written
    /// (or a failed attempt to write it logged). Store errors from the
    /// claim are returned; per-item failures never are.
    pub async fn run(&self) -> AppResult<RunOutcome> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::warn!(
                "{} processing already in progress, skipping this run",
                self.name()
            );
            return Ok(RunOutcome::Skipped);
        };

        let items = self.queue.claim_batch(self.max_concurrency).await?;
        if items.is_empty() {
            tracing::debug!("No pending {} jobs found", self.name());
            return Ok(RunOutcome::Idle);
        }

        tracing::info!(
            "Found {} pending {} jobs to process",
            items.len(),
            self.name()
        );

        let mut report = BatchReport {
            claimed: items.len(),
            ..BatchReport::default()
        };

        let mut batch = JoinSet::new();
        for item in items {
            let queue = self.queue.clone();
            let handler = Arc::clone(&self.handler);
            batch.spawn(process_item(queue, handler, item));
        }

        while let Some(joined) = batch.join_next().await {
            match joined {
                Ok(JobStatus::Success) => report.succeeded += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    tracing::error!("{} job task did not complete: {}", self.name(), e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "{} batch completed: claimed={}, succeeded={}, failed={}",
            self.name(),
            report.claimed,
            report.succeeded,
            report.failed
        );

        Ok(RunOutcome::Completed(report))
    }
}

/// Execute one item and record its terminal status.
async fn process_item<H: JobHandler>(
    queue: GenericQueue<H::Item>,
    handler: Arc<H>,
    item: H::Item,
) -> JobStatus {
    let id = item.id().clone();
    let job_type = handler.job_type().to_string();

    let executed = AssertUnwindSafe(handler.execute(&item))
        .catch_unwind()
        .await;

    let status = match executed {
        Ok(Ok(())) => {
            tracing::info!("Job {} ({}) succeeded: {}", id, job_type, item.describe());
            JobStatus::Success
        }
        Ok(Err(JobExecutionError::Transient(msg))) => {
            tracing::warn!("Job {} ({}) failed (transient): {}", id, job_type, msg);
            JobStatus::Failed
        }
        Ok(Err(e)) => {
            tracing::error!("Job {} ({}) failed: {}", id, job_type, e);
            JobStatus::Failed
        }
        Err(_) => {
            tracing::error!("Job {} ({}) panicked", id, job_type);
            JobStatus::Failed
        }
    };

    if let Err(e) = queue.update_status(&id, status).await {
        tracing::error!(
            "Failed to mark job {} ({}) as {}: {}",
            id,
            job_type,
            status,
            e
        );
    }

    status
}

#[async_trait]
impl<H: JobHandler> ScheduledJob for Processor<H> {
    fn name(&self) -> &str {
        Processor::name(self)
    }

    async fn run_once(&self) {
        match self.run().await {
            Ok(outcome) => tracing::trace!("{} run finished: {:?}", self.name(), outcome),
            Err(e) => tracing::error!("{} run failed: {}", self.name(), e),
        }
    }

    fn is_running(&self) -> bool {
        Processor::is_running(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3browser_core::config::StoreConfig;
    use s3browser_entity::job::{JobKind, PublishJob};
    use s3browser_store::DurableStore;

    /// Succeeds unless the file path says otherwise.
    #[derive(Debug)]
    struct ScriptedHandler;

    #[async_trait]
    impl JobHandler for ScriptedHandler {
        type Item = PublishJob;

        fn job_type(&self) -> &str {
            "scripted"
        }

        async fn execute(&self, item: &PublishJob) -> Result<(), JobExecutionError> {
            match item.file_path.as_str() {
                "panic" => panic!("handler blew up"),
                "fail" => Err(JobExecutionError::Transient("nope".into())),
                _ => Ok(()),
            }
        }
    }

    fn queue(dir: &tempfile::TempDir) -> GenericQueue<PublishJob> {
        let config = StoreConfig::at(dir.path().to_string_lossy());
        let store = DurableStore::open(&config, &JobKind::partitions()).unwrap();
        GenericQueue::new(Arc::new(store)).unwrap()
    }

    #[test]
    fn test_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let guard = InFlightGuard::acquire(&flag).unwrap();
        assert!(InFlightGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(InFlightGuard::acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn test_idle_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let processor = Processor::new(queue(&dir), ScriptedHandler, 3);
        assert_eq!(processor.run().await.unwrap(), RunOutcome::Idle);
        assert!(!processor.is_running());
    }

    #[tokio::test]
    async fn test_failures_and_panics_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue(&dir);
        let ok = queue.push(PublishJob::new("ok", "ok")).await.unwrap();
        let fail = queue.push(PublishJob::new("fail", "fail")).await.unwrap();
        let panic = queue.push(PublishJob::new("panic", "panic")).await.unwrap();

        let processor = Processor::new(queue.clone(), ScriptedHandler, 3);
        let outcome = processor.run().await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Completed(BatchReport {
                claimed: 3,
                succeeded: 1,
                failed: 2,
            })
        );

        assert_eq!(queue.get(ok.id()).await.unwrap().status(), JobStatus::Success);
        assert_eq!(queue.get(fail.id()).await.unwrap().status(), JobStatus::Failed);
        assert_eq!(queue.get(panic.id()).await.unwrap().status(), JobStatus::Failed);
        assert!(!processor.is_running());
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_claims() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue(&dir);
        queue.push(PublishJob::new("ok", "ok")).await.unwrap();

        let processor = Processor::new(queue, ScriptedHandler, 0);
        assert_eq!(processor.max_concurrency(), 1);
        assert!(matches!(
            processor.run().await.unwrap(),
            RunOutcome::Completed(BatchReport { claimed: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_claim_error_releases_guard_and_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            map_size_mb: 1,
            ..StoreConfig::at(dir.path().to_string_lossy())
        };
        let store = DurableStore::open(&config, &JobKind::partitions()).unwrap();
        let queue: GenericQueue<PublishJob> = GenericQueue::new(Arc::new(store)).unwrap();

        // Fill the map until a write no longer fits.
        let padding = "x".repeat(3 * 1024);
        let mut pushed = 0;
        for n in 0..10_000 {
            let path = format!("{n}/{padding}");
            if queue.push(PublishJob::new(path, "big")).await.is_err() {
                break;
            }
            pushed += 1;
        }
        assert!(pushed > 0 && pushed < 10_000);

        let processor = Processor::new(queue.clone(), ScriptedHandler, 10_000);
        assert!(processor.run().await.is_err());
        assert!(!processor.is_running());

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.processing, 0);
        assert_eq!(stats.pending, pushed);
    }
}
