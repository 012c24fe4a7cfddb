//! S3 Browser queue server
//!
//! Opens the durable job store, binds the four job queues to the object
//! store and runs their processors until a shutdown signal arrives.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use s3browser_core::config::AppConfig;
use s3browser_core::error::AppError;
use s3browser_core::traits::ObjectStore;
use s3browser_storage::S3ObjectStore;
use s3browser_store::DurableStore;
use s3browser_worker::{JobQueues, Scheduler};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("S3BROWSER_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

    AppConfig::load(&config_path)
        .map_err(|e| AppError::configuration(format!("Config load error: {}", e)))
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting S3 Browser v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Durable store ────────────────────────────────────
    tracing::info!("Opening job store at '{}'...", config.store.path);
    let store_config = config.store.clone();
    let store = tokio::task::spawn_blocking(move || {
        DurableStore::open(&store_config, &JobQueues::partitions())
    })
    .await
    .map_err(|e| AppError::internal(format!("Store open task failed: {}", e)))??;
    let store = Arc::new(store);
    let queues = JobQueues::open(Arc::clone(&store))?;
    tracing::info!("Job store opened");

    for (kind, stats) in queues.stats().await? {
        if stats.processing > 0 {
            tracing::warn!(
                "{} {} job(s) were left PROCESSING; requeue them with `s3browser-cli jobs requeue-stuck {}`",
                stats.processing,
                kind,
                kind
            );
        }
    }

    // ── Step 2: Object storage ───────────────────────────────────
    tracing::info!(
        "Initializing object storage (bucket: {})...",
        config.storage.s3.bucket
    );
    let object_store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(&config.storage)?);

    // ── Step 3: Scheduler ────────────────────────────────────────
    let scheduler =
        Scheduler::with_default_jobs(&config.queue, &queues, Arc::clone(&object_store));
    scheduler.start();
    tracing::info!("Background processors started");

    // ── Step 4: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    scheduler.stop().await;
    drop(scheduler);
    drop(queues);
    drop(object_store);

    match Arc::try_unwrap(store) {
        Ok(store) => store.close(),
        Err(_) => tracing::warn!("Job store still shared at shutdown; leaving it to the OS"),
    }

    tracing::info!("S3 Browser shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
