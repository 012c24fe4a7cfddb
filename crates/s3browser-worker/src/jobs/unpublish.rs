//! Make-private job handler.

use std::sync::Arc;

use async_trait::async_trait;

use s3browser_core::traits::ObjectStore;
use s3browser_entity::job::UnpublishJob;

use crate::executor::{JobExecutionError, JobHandler};

/// Revokes anonymous read access to the job's object.
#[derive(Debug)]
pub struct UnpublishJobHandler {
    store: Arc<dyn ObjectStore>,
}

impl UnpublishJobHandler {
    /// Create a new unpublish job handler
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for UnpublishJobHandler {
    type Item = UnpublishJob;

    fn job_type(&self) -> &str {
        "unpublish"
    }

    async fn execute(&self, item: &UnpublishJob) -> Result<(), JobExecutionError> {
        if item.file_path.is_empty() {
            return Err(JobExecutionError::Permanent("File path is empty".into()));
        }

        tracing::info!("Unpublishing {}", item.file_path);
        self.store
            .make_private(&item.file_path)
            .await
            .map_err(JobExecutionError::from_side_effect)
    }
}
