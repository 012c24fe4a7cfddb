//! Object and folder delete job handler.

use std::sync::Arc;

use async_trait::async_trait;

use s3browser_core::traits::ObjectStore;
use s3browser_entity::job::DeleteJob;

use crate::executor::{JobExecutionError, JobHandler};

/// Deletes the job's object, or every object under it when the path is a
/// folder (ends in `/`).
#[derive(Debug)]
pub struct DeleteJobHandler {
    store: Arc<dyn ObjectStore>,
}

impl DeleteJobHandler {
    /// Create a new delete job handler
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for DeleteJobHandler {
    type Item = DeleteJob;

    fn job_type(&self) -> &str {
        "delete"
    }

    async fn execute(&self, item: &DeleteJob) -> Result<(), JobExecutionError> {
        if item.file_path.is_empty() {
            return Err(JobExecutionError::Permanent("File path is empty".into()));
        }

        tracing::info!("Deleting {}", item.file_path);
        self.store
            .delete(&item.file_path)
            .await
            .map_err(JobExecutionError::from_side_effect)
    }
}
