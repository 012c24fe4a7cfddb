//! Remote fetch-and-store job handler.

use std::sync::Arc;

use async_trait::async_trait;

use s3browser_core::traits::ObjectStore;
use s3browser_entity::job::FetchJob;

use crate::executor::{JobExecutionError, JobHandler};

/// Downloads the job's remote URL into the bucket.
#[derive(Debug)]
pub struct FetchJobHandler {
    /// Object store the download is written to
    store: Arc<dyn ObjectStore>,
}

impl FetchJobHandler {
    /// Create a new fetch job handler
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for FetchJobHandler {
    type Item = FetchJob;

    fn job_type(&self) -> &str {
        "fetch"
    }

    async fn execute(&self, item: &FetchJob) -> Result<(), JobExecutionError> {
        if item.remote_url.trim().is_empty() {
            return Err(JobExecutionError::Permanent("Remote URL is empty".into()));
        }
        if item.destination_name.trim().is_empty() {
            return Err(JobExecutionError::Permanent(
                "Destination name is empty".into(),
            ));
        }

        let key = item.destination_key();
        tracing::info!("Fetching {} -> {}", item.remote_url, key);

        self.store
            .fetch_and_store(&item.remote_url, &key)
            .await
            .map_err(JobExecutionError::from_side_effect)
    }
}
