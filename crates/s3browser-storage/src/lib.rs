//! # s3browser-storage
//!
//! Object storage for the S3 Browser job queue: an S3-compatible
//! [`ObjectStore`](s3browser_core::traits::ObjectStore) implementation and
//! the HTTP fetcher fetch jobs download remote files with.

pub mod fetch;
pub mod providers;

pub use fetch::RemoteFetcher;
pub use providers::S3ObjectStore;
