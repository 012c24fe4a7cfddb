//! Background queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Batch size used when a job kind has no positive `max_concurrency`.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Interval used for fetch jobs when none is configured.
pub const DEFAULT_FETCH_INTERVAL_SECONDS: u64 = 10;

/// Interval used for publish, unpublish and delete jobs when none is configured.
pub const DEFAULT_ACL_INTERVAL_SECONDS: u64 = 5;

/// Per-kind queue processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Upper bound in seconds on how long shutdown waits for in-flight batches.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
    /// Remote fetch-and-store jobs.
    #[serde(default)]
    pub fetch: JobQueueConfig,
    /// Make-public jobs.
    #[serde(default)]
    pub publish: JobQueueConfig,
    /// Make-private jobs.
    #[serde(default)]
    pub unpublish: JobQueueConfig,
    /// Delete jobs.
    #[serde(default)]
    pub delete: JobQueueConfig,
}

impl QueueConfig {
    /// Effective schedule for fetch jobs.
    pub fn fetch_schedule(&self) -> JobSchedule {
        self.fetch.resolve(DEFAULT_FETCH_INTERVAL_SECONDS)
    }

    /// Effective schedule for publish jobs.
    pub fn publish_schedule(&self) -> JobSchedule {
        self.publish.resolve(DEFAULT_ACL_INTERVAL_SECONDS)
    }

    /// Effective schedule for unpublish jobs.
    pub fn unpublish_schedule(&self) -> JobSchedule {
        self.unpublish.resolve(DEFAULT_ACL_INTERVAL_SECONDS)
    }

    /// Effective schedule for delete jobs.
    pub fn delete_schedule(&self) -> JobSchedule {
        self.delete.resolve(DEFAULT_ACL_INTERVAL_SECONDS)
    }

    /// Shutdown wait bound.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_seconds: default_shutdown_timeout(),
            fetch: JobQueueConfig::default(),
            publish: JobQueueConfig::default(),
            unpublish: JobQueueConfig::default(),
            delete: JobQueueConfig::default(),
        }
    }
}

/// Raw settings for one job kind.
///
/// Values are signed so that zero or negative input can be detected and
/// replaced by the defaults instead of being rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobQueueConfig {
    /// Seconds between scheduler ticks.
    #[serde(default)]
    pub interval_seconds: i64,
    /// Maximum items claimed (and executed concurrently) per tick.
    #[serde(default)]
    pub max_concurrency: i64,
}

impl JobQueueConfig {
    /// Resolve into an effective schedule, substituting defaults for
    /// non-positive values.
    pub fn resolve(&self, default_interval_seconds: u64) -> JobSchedule {
        let interval_seconds = u64::try_from(self.interval_seconds)
            .ok()
            .filter(|secs| *secs > 0)
            .unwrap_or(default_interval_seconds);

        let max_concurrency = usize::try_from(self.max_concurrency)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_CONCURRENCY);

        JobSchedule {
            interval: Duration::from_secs(interval_seconds),
            max_concurrency,
        }
    }
}

/// Effective tick interval and batch width for one job kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSchedule {
    /// Time between scheduler ticks.
    pub interval: Duration,
    /// Maximum items claimed and executed concurrently per tick.
    pub max_concurrency: usize,
}

fn default_shutdown_timeout() -> u64 {
    30
}
