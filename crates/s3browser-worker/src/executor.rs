//! Job handler contract for the per-item side effect.

use async_trait::async_trait;

use s3browser_core::error::{AppError, ErrorKind};
use s3browser_entity::job::QueueItem;

/// Performs the side effect of one job kind for a single item.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug + 'static {
    /// The job record this handler consumes.
    type Item: QueueItem;

    /// Get the job type this handler processes
    fn job_type(&self) -> &str;

    /// Execute the side effect for `item`
    async fn execute(&self, item: &Self::Item) -> Result<(), JobExecutionError>;
}

/// Error from job execution.
///
/// The queue engine records every variant as a terminal `FAILED` status;
/// the distinction only shapes the log line.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// The job can never succeed as written (bad payload)
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// The collaborator failed; re-pushing the job may succeed
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Classify an object store failure.
    pub fn from_side_effect(err: AppError) -> Self {
        match err.kind {
            ErrorKind::ExternalService | ErrorKind::Storage => Self::Transient(err.to_string()),
            ErrorKind::Validation | ErrorKind::NotFound => Self::Permanent(err.to_string()),
            _ => Self::Internal(err),
        }
    }

    /// Whether re-pushing the same job could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_side_effect_errors() {
        let err = JobExecutionError::from_side_effect(AppError::storage("denied"));
        assert!(err.is_transient());

        let err = JobExecutionError::from_side_effect(AppError::validation("empty key"));
        assert!(matches!(err, JobExecutionError::Permanent(_)));

        let err = JobExecutionError::from_side_effect(AppError::internal("bug"));
        assert!(matches!(err, JobExecutionError::Internal(_)));
    }
}
