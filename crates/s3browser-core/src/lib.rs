//! # s3browser-core
//!
//! Core crate for S3 Browser. Contains the configuration schema, the job
//! identity type, the object-store collaborator trait, and the unified
//! error system shared by the queue engine and its tooling.
//!
//! This crate has **no** internal dependencies on other S3 Browser crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
