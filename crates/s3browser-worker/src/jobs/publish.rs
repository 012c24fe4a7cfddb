//! Make-public job handler.

use std::sync::Arc;

use async_trait::async_trait;

use s3browser_core::traits::ObjectStore;
use s3browser_entity::job::PublishJob;

use crate::executor::{JobExecutionError, JobHandler};

/// Grants anonymous read access to the job's object.
#[derive(Debug)]
pub struct PublishJobHandler {
    /// Object store holding the object
    store: Arc<dyn ObjectStore>,
}

impl PublishJobHandler {
    /// Create a new publish job handler
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for PublishJobHandler {
    type Item = PublishJob;

    fn job_type(&self) -> &str {
        "publish"
    }

    async fn execute(&self, item: &PublishJob) -> Result<(), JobExecutionError> {
        if item.file_path.is_empty() {
            return Err(JobExecutionError::Permanent("File path is empty".into()));
        }

        tracing::info!("Publishing {}", item.file_path);
        self.store
            .make_public(&item.file_path)
            .await
            .map_err(JobExecutionError::from_side_effect)
    }
}
