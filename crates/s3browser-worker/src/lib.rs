//! Background job processing for S3 Browser.
//!
//! This crate provides:
//! - A generic, durable job queue per job kind over the shared store
//! - A batch processor per job kind with a single-flight guard
//! - A periodic scheduler that drives every processor on its own interval
//! - Job handlers that perform the per-item object store side effects

pub mod executor;
pub mod jobs;
pub mod processor;
pub mod queue;
pub mod queues;
pub mod scheduler;

pub use executor::{JobExecutionError, JobHandler};
pub use processor::{BatchReport, Processor, RunOutcome};
pub use queue::{GenericQueue, QueueStats};
pub use queues::JobQueues;
pub use scheduler::{ScheduledJob, Scheduler};
