//! # s3browser-entity
//!
//! Domain records for the background job queue. Every job record carries
//! an identity and a [`job::JobStatus`] plus kind-specific payload fields,
//! and is persisted as JSON in its kind's partition of the durable store.

pub mod job;
