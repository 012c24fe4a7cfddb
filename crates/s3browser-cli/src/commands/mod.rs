//! CLI command definitions and dispatch.

pub mod jobs;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use s3browser_core::config::AppConfig;
use s3browser_core::error::AppError;
use s3browser_store::DurableStore;
use s3browser_worker::JobQueues;

/// S3 Browser job queue administration
#[derive(Debug, Parser)]
#[command(name = "s3browser-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "S3BROWSER_CONFIG", default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect, enqueue and repair background jobs
    Jobs(jobs::JobsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Jobs(args) => jobs::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
        .map_err(|e| AppError::configuration(format!("Failed to load config: {}", e)))
}

/// The store and its queues, opened for one command.
pub struct QueueSession {
    store: Arc<DurableStore>,
    /// Typed queues over the store
    pub queues: JobQueues,
}

impl QueueSession {
    /// Open the store named by the configuration.
    pub async fn open(config: &AppConfig) -> Result<Self, AppError> {
        let store_config = config.store.clone();
        let store = tokio::task::spawn_blocking(move || {
            DurableStore::open(&store_config, &JobQueues::partitions())
        })
        .await
        .map_err(|e| AppError::internal(format!("Store open task failed: {}", e)))??;

        let store = Arc::new(store);
        let queues = JobQueues::open(Arc::clone(&store))?;
        Ok(Self { store, queues })
    }

    /// Drop the queues and close the store.
    pub fn close(self) {
        let Self { store, queues } = self;
        drop(queues);
        match Arc::try_unwrap(store) {
            Ok(store) => store.close(),
            Err(_) => tracing::warn!("Store still shared at exit; skipping close"),
        }
    }
}
