//! Object store collaborator used by the background job handlers.

use async_trait::async_trait;

use crate::result::AppResult;

/// The side-effect surface the job queue drives.
///
/// Implemented by `s3browser-storage` for S3-compatible services. Every
/// call may fail; the queue engine records the failure as a terminal job
/// status and never retries it on its own.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "s3").
    fn provider_type(&self) -> &str;

    /// Download `source_url` and store the body under `key`.
    async fn fetch_and_store(&self, source_url: &str, key: &str) -> AppResult<()>;

    /// Grant anonymous read access to `key`.
    async fn make_public(&self, key: &str) -> AppResult<()>;

    /// Revoke anonymous read access to `key`.
    async fn make_private(&self, key: &str) -> AppResult<()>;

    /// Delete `key`. Keys ending in `/` address a folder and remove every
    /// object under that prefix.
    async fn delete(&self, key: &str) -> AppResult<()>;
}
