//! S3-compatible object store.
//!
//! Works against AWS S3 and compatible services (MinIO, R2, Spaces) via
//! path-style addressing and an optional custom endpoint.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use bytes::Bytes;
use tracing::{debug, info};

use s3browser_core::config::StorageConfig;
use s3browser_core::error::AppError;
use s3browser_core::result::AppResult;
use s3browser_core::traits::ObjectStore;

use crate::fetch::RemoteFetcher;

/// Provider name reported through [`ObjectStore::provider_type`].
const PROVIDER: &str = "s3";

/// Object store backed by one S3 bucket.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    fetcher: RemoteFetcher,
}

impl S3ObjectStore {
    /// Build a store from the storage configuration.
    pub fn new(config: &StorageConfig) -> AppResult<Self> {
        let s3 = &config.s3;
        if s3.bucket.is_empty() {
            return Err(AppError::configuration("storage.s3.bucket must be set"));
        }

        let credentials =
            Credentials::new(&s3.access_key, &s3.secret_key, None, None, "s3browser");
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(s3.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true);
        if !s3.endpoint.is_empty() {
            builder = builder.endpoint_url(&s3.endpoint);
        }
        let client = Client::from_conf(builder.build());

        info!(
            bucket = %s3.bucket,
            endpoint = %s3.endpoint,
            region = %s3.region,
            "S3 object store initialized"
        );

        Ok(Self {
            client,
            bucket: s3.bucket.clone(),
            fetcher: RemoteFetcher::from_config(config)?,
        })
    }

    /// Bucket this store writes to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload `body` under `key` as a private object.
    pub async fn put_object(&self, key: &str, body: Bytes) -> AppResult<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .acl(ObjectCannedAcl::Private)
            .content_type(content_type_for(key))
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| storage_error(&format!("Failed to put '{key}'"), e))?;
        debug!(key, bytes = size, "Object stored");
        Ok(())
    }

    async fn set_acl(&self, key: &str, acl: ObjectCannedAcl) -> AppResult<()> {
        let context = format!("Failed to set ACL {} on '{key}'", acl.as_str());
        self.client
            .put_object_acl()
            .bucket(&self.bucket)
            .key(key)
            .acl(acl)
            .send()
            .await
            .map_err(|e| storage_error(&context, e))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| storage_error(&format!("Failed to delete '{key}'"), e))?;
        Ok(())
    }

    /// Delete every object under `prefix`; returns how many were removed.
    ///
    /// Stops at the first failed delete.
    pub async fn delete_prefix(&self, prefix: &str) -> AppResult<usize> {
        let mut continuation: Option<String> = None;
        let mut deleted = 0;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| storage_error(&format!("Failed to list '{prefix}'"), e))?;

            for object in response.contents() {
                if let Some(key) = object.key() {
                    self.delete_object(key).await?;
                    deleted += 1;
                }
            }

            if response.is_truncated() != Some(true) {
                break;
            }
            continuation = response.next_continuation_token().map(str::to_string);
            if continuation.is_none() {
                break;
            }
        }

        debug!(prefix, deleted, "Folder deleted");
        Ok(deleted)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn provider_type(&self) -> &str {
        PROVIDER
    }

    async fn fetch_and_store(&self, source_url: &str, key: &str) -> AppResult<()> {
        let body = self.fetcher.download(source_url).await?;
        self.put_object(key, body).await
    }

    async fn make_public(&self, key: &str) -> AppResult<()> {
        self.set_acl(key, ObjectCannedAcl::PublicRead).await
    }

    async fn make_private(&self, key: &str) -> AppResult<()> {
        self.set_acl(key, ObjectCannedAcl::Private).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        if key.ends_with('/') {
            self.delete_prefix(key).await.map(|_| ())
        } else {
            self.delete_object(key).await
        }
    }
}

/// Content type for an object key, guessed from its extension.
pub fn content_type_for(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn storage_error(context: &str, err: impl std::error::Error) -> AppError {
    AppError::storage(format!("{context}: {}", DisplayErrorContext(&err)))
}
