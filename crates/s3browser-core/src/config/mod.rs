//! Application configuration schemas.
//!
//! All configuration structs are deserialized from an optional TOML file
//! via the `config` crate, overlaid with `S3BROWSER__*` environment
//! variables. Each sub-module represents a logical configuration section.

pub mod logging;
pub mod queue;
pub mod storage;
pub mod store;

use serde::{Deserialize, Serialize};

pub use self::logging::LoggingConfig;
pub use self::queue::{JobQueueConfig, JobSchedule, QueueConfig};
pub use self::storage::{S3StorageConfig, StorageConfig};
pub use self::store::StoreConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Durable queue store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Object storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Background queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// The file is optional; environment variables prefixed with
    /// `S3BROWSER` (nested with `__`) override it.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("S3BROWSER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
