//! Periodic scheduler driving one processor per job kind.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};

use s3browser_core::config::QueueConfig;
use s3browser_core::traits::ObjectStore;

use crate::jobs::{DeleteJobHandler, FetchJobHandler, PublishJobHandler, UnpublishJobHandler};
use crate::processor::Processor;
use crate::queues::JobQueues;

/// A unit of periodic work.
#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    /// Name used in logs and for [`Scheduler::is_processing`].
    fn name(&self) -> &str;

    /// Run once; failures are logged, never returned.
    async fn run_once(&self);

    /// Whether a run is currently in flight.
    fn is_running(&self) -> bool;
}

struct Registration {
    job: Arc<dyn ScheduledJob>,
    interval: Duration,
}

enum State {
    Idle,
    Running(Vec<JoinHandle<()>>),
    Stopped,
}

/// Fires every registered job on its own fixed interval.
///
/// Each tick's run is spawned as its own task, so a slow run never delays
/// the timer; overlapping runs are resolved by the job itself (processors
/// skip while a batch is in flight). Stopping waits for runs already
/// started.
pub struct Scheduler {
    /// Registered jobs and their intervals
    jobs: Vec<Registration>,
    /// Upper bound on the wait in [`Scheduler::stop`]
    shutdown_timeout: Duration,
    /// Cancellation broadcast to every periodic task
    cancel: watch::Sender<bool>,
    state: Mutex<State>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("jobs", &self.job_names())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl Scheduler {
    /// Create an empty scheduler
    pub fn new(shutdown_timeout: Duration) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            shutdown_timeout,
            cancel,
            state: Mutex::new(State::Idle),
        }
    }

    /// Create a scheduler with a processor for each of the four job kinds
    pub fn with_default_jobs(
        config: &QueueConfig,
        queues: &JobQueues,
        object_store: Arc<dyn ObjectStore>,
    ) -> Self {
        let mut scheduler = Self::new(config.shutdown_timeout());

        let schedule = config.fetch_schedule();
        scheduler.register(
            Arc::new(Processor::new(
                queues.fetch.clone(),
                FetchJobHandler::new(Arc::clone(&object_store)),
                schedule.max_concurrency,
            )),
            schedule.interval,
        );

        let schedule = config.publish_schedule();
        scheduler.register(
            Arc::new(Processor::new(
                queues.publish.clone(),
                PublishJobHandler::new(Arc::clone(&object_store)),
                schedule.max_concurrency,
            )),
            schedule.interval,
        );

        let schedule = config.unpublish_schedule();
        scheduler.register(
            Arc::new(Processor::new(
                queues.unpublish.clone(),
                UnpublishJobHandler::new(Arc::clone(&object_store)),
                schedule.max_concurrency,
            )),
            schedule.interval,
        );

        let schedule = config.delete_schedule();
        scheduler.register(
            Arc::new(Processor::new(
                queues.delete.clone(),
                DeleteJobHandler::new(object_store),
                schedule.max_concurrency,
            )),
            schedule.interval,
        );

        scheduler
    }

    /// Register a job to fire every `interval`. Takes effect at `start`.
    pub fn register(&mut self, job: Arc<dyn ScheduledJob>, interval: Duration) {
        let interval = interval.max(Duration::from_millis(1));
        tracing::info!("Registered: {} (every {:?})", job.name(), interval);
        self.jobs.push(Registration { job, interval });
    }

    /// Names of all registered jobs, in registration order.
    pub fn job_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|r| r.job.name()).collect()
    }

    /// Whether the named job has a run in flight.
    pub fn is_processing(&self, name: &str) -> bool {
        self.jobs
            .iter()
            .find(|r| r.job.name() == name)
            .is_some_and(|r| r.job.is_running())
    }

    /// Whether the periodic tasks are running.
    pub fn is_started(&self) -> bool {
        matches!(*self.lock_state(), State::Running(_))
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Spawn one periodic task per registered job.
    ///
    /// Must be called inside a Tokio runtime. Calling it again, or after
    /// [`Scheduler::stop`], does nothing.
    pub fn start(&self) {
        let mut state = self.lock_state();
        match *state {
            State::Idle => {}
            State::Running(_) => {
                tracing::debug!("Scheduler already started");
                return;
            }
            State::Stopped => {
                tracing::warn!("Scheduler was stopped; ignoring start");
                return;
            }
        }

        let handles = self
            .jobs
            .iter()
            .map(|r| {
                tokio::spawn(run_periodic(
                    Arc::clone(&r.job),
                    r.interval,
                    self.cancel.subscribe(),
                ))
            })
            .collect();
        *state = State::Running(handles);

        tracing::info!("Scheduler started with {} jobs", self.jobs.len());
    }

    /// Cancel every timer and wait for runs already in flight.
    ///
    /// The wait is bounded by the shutdown timeout; runs still going after
    /// it keep running detached. Stopping before starting does nothing.
    pub async fn stop(&self) {
        let handles = {
            let mut state = self.lock_state();
            match std::mem::replace(&mut *state, State::Stopped) {
                State::Running(handles) => handles,
                previous @ (State::Idle | State::Stopped) => {
                    *state = previous;
                    return;
                }
            }
        };

        self.cancel.send_replace(true);
        tracing::info!("Scheduler stopping, waiting for in-flight runs to complete...");

        let wait = futures::future::join_all(handles);
        match time::timeout(self.shutdown_timeout, wait).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        tracing::error!("Scheduler task ended abnormally: {}", e);
                    }
                }
                tracing::info!("Scheduler stopped");
            }
            Err(_) => {
                tracing::warn!(
                    "Scheduler stop timed out after {:?}; in-flight runs left detached",
                    self.shutdown_timeout
                );
            }
        }
    }
}

/// Tick loop for one job; runs until cancelled, then joins its runs.
async fn run_periodic(
    job: Arc<dyn ScheduledJob>,
    period: Duration,
    mut cancel: watch::Receiver<bool>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let job = Arc::clone(&job);
                runs.spawn(async move { job.run_once().await });
            }
            Some(finished) = runs.join_next(), if !runs.is_empty() => {
                if let Err(e) = finished {
                    tracing::error!("Scheduled run of '{}' ended abnormally: {}", job.name(), e);
                }
            }
        }
    }

    while let Some(finished) = runs.join_next().await {
        if let Err(e) = finished {
            tracing::error!("Scheduled run of '{}' ended abnormally: {}", job.name(), e);
        }
    }
    tracing::debug!("Scheduled job '{}' stopped", job.name());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Counts runs; each run sleeps for `work`.
    #[derive(Default)]
    struct CountingJob {
        runs: AtomicUsize,
        finished: AtomicUsize,
        running: AtomicBool,
        work: Duration,
    }

    #[async_trait]
    impl ScheduledJob for CountingJob {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run_once(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.running.store(true, Ordering::SeqCst);
            time::sleep(self.work).await;
            self.running.store(false, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_on_interval() {
        let job = Arc::new(CountingJob::default());
        let mut scheduler = Scheduler::new(Duration::from_secs(5));
        scheduler.register(job.clone(), Duration::from_secs(10));

        scheduler.start();
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(26)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 3);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let job = Arc::new(CountingJob::default());
        let mut scheduler = Scheduler::new(Duration::from_secs(5));
        scheduler.register(job.clone(), Duration::from_secs(10));

        scheduler.start();
        scheduler.start();
        assert!(scheduler.is_started());
        time::sleep(Duration::from_secs(11)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);

        scheduler.stop().await;
        assert!(!scheduler.is_started());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_start_is_noop() {
        let job = Arc::new(CountingJob::default());
        let mut scheduler = Scheduler::new(Duration::from_secs(5));
        scheduler.register(job.clone(), Duration::from_secs(1));

        scheduler.stop().await;
        scheduler.start();
        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);

        scheduler.stop().await;
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_in_flight_run() {
        let job = Arc::new(CountingJob {
            work: Duration::from_secs(3),
            ..CountingJob::default()
        });
        let mut scheduler = Scheduler::new(Duration::from_secs(30));
        scheduler.register(job.clone(), Duration::from_secs(1));

        scheduler.start();
        time::sleep(Duration::from_millis(1500)).await;
        assert!(scheduler.is_processing("counting"));

        scheduler.stop().await;
        assert!(!scheduler.is_processing("counting"));
        assert_eq!(
            job.runs.load(Ordering::SeqCst),
            job.finished.load(Ordering::SeqCst)
        );

        let runs = job.runs.load(Ordering::SeqCst);
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), runs);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_bounded() {
        let job = Arc::new(CountingJob {
            work: Duration::from_secs(600),
            ..CountingJob::default()
        });
        let mut scheduler = Scheduler::new(Duration::from_secs(2));
        scheduler.register(job.clone(), Duration::from_secs(1));

        scheduler.start();
        time::sleep(Duration::from_millis(1500)).await;

        let before = Instant::now();
        scheduler.stop().await;
        assert!(before.elapsed() <= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_run_starts_after_stop_on_due_tick() {
        let job = Arc::new(CountingJob::default());
        let (cancel, rx) = watch::channel(false);
        let task = tokio::spawn(run_periodic(job.clone(), Duration::from_secs(1), rx));

        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);

        // Cancel, then let the next tick fall due before the task is polled.
        cancel.send_replace(true);
        time::advance(Duration::from_secs(1)).await;
        task.await.unwrap();

        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_is_processing_unknown_job() {
        let scheduler = Scheduler::new(Duration::from_secs(1));
        assert!(!scheduler.is_processing("missing"));
        assert!(scheduler.job_names().is_empty());
    }
}
