//! Convenience result type alias for S3 Browser.

use crate::error::AppError;

/// A specialized `Result` type for S3 Browser operations.
pub type AppResult<T> = Result<T, AppError>;
