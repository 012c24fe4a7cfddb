//! Job queue CLI commands.

use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use s3browser_core::error::AppError;
use s3browser_core::types::JobId;
use s3browser_entity::job::{
    DeleteJob, FetchJob, JobKind, JobStatus, PublishJob, QueueItem, UnpublishJob,
};
use s3browser_worker::GenericQueue;

use super::QueueSession;

/// Arguments for job commands
#[derive(Debug, Args)]
pub struct JobsArgs {
    /// Jobs subcommand
    #[command(subcommand)]
    pub command: JobsCommand,
}

/// Job kind selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Remote fetch-and-store jobs
    Fetch,
    /// Make-public jobs
    Publish,
    /// Make-private jobs
    Unpublish,
    /// Delete jobs
    Delete,
}

impl From<KindArg> for JobKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Fetch => JobKind::Fetch,
            KindArg::Publish => JobKind::Publish,
            KindArg::Unpublish => JobKind::Unpublish,
            KindArg::Delete => JobKind::Delete,
        }
    }
}

/// Jobs subcommands
#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// List jobs of one kind
    List {
        /// Job kind
        kind: KindArg,
        /// Only show jobs with this status (pending, processing, success, failed)
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Show a single job
    Get {
        /// Job kind
        kind: KindArg,
        /// Job ID
        id: String,
    },
    /// Show job counts per kind and status
    Stats,
    /// Delete every job of one kind
    Clear {
        /// Job kind
        kind: KindArg,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Put one job back to PENDING so it is processed again
    Reset {
        /// Job kind
        kind: KindArg,
        /// Job ID
        id: String,
    },
    /// Put every PROCESSING job of one kind back to PENDING
    RequeueStuck {
        /// Job kind
        kind: KindArg,
    },
    /// Enqueue a remote download
    PushFetch {
        /// URL to download
        url: String,
        /// Object name to store the download under
        name: String,
        /// Target folder in the bucket
        #[arg(long, default_value = "")]
        folder: String,
    },
    /// Enqueue a make-public job
    PushPublish {
        /// Object key
        path: String,
        /// Display name (defaults to the last path segment)
        #[arg(long)]
        name: Option<String>,
    },
    /// Enqueue a make-private job
    PushUnpublish {
        /// Object key
        path: String,
        /// Display name (defaults to the last path segment)
        #[arg(long)]
        name: Option<String>,
    },
    /// Enqueue a delete job (a key ending in '/' deletes the folder)
    PushDelete {
        /// Object key or folder prefix
        path: String,
        /// Display name (defaults to the last path segment)
        #[arg(long)]
        name: Option<String>,
    },
}

/// Job row for table display
#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    /// Job ID
    id: String,
    /// Status
    status: String,
    /// What the job does
    target: String,
}

/// Stats row for table display
#[derive(Debug, Serialize, Tabled)]
struct StatsRow {
    /// Job kind
    kind: String,
    /// Partition
    partition: String,
    /// Total
    total: usize,
    /// Pending
    pending: usize,
    /// Processing
    processing: usize,
    /// Succeeded
    succeeded: usize,
    /// Failed
    failed: usize,
}

/// Run `$body` with `$queue` bound to the typed queue for `$kind`.
macro_rules! with_queue {
    ($queues:expr, $kind:expr, |$queue:ident| $body:expr) => {
        match JobKind::from($kind) {
            JobKind::Fetch => {
                let $queue = &$queues.fetch;
                $body
            }
            JobKind::Publish => {
                let $queue = &$queues.publish;
                $body
            }
            JobKind::Unpublish => {
                let $queue = &$queues.unpublish;
                $body
            }
            JobKind::Delete => {
                let $queue = &$queues.delete;
                $body
            }
        }
    };
}

/// Execute job commands
pub async fn execute(
    args: &JobsArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let session = QueueSession::open(&config).await?;
    let result = run(args, &session, format).await;
    session.close();
    result
}

async fn run(args: &JobsArgs, session: &QueueSession, format: OutputFormat) -> Result<(), AppError> {
    let queues = &session.queues;

    match &args.command {
        JobsCommand::List { kind, status } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            with_queue!(queues, *kind, |queue| list(queue, status, format).await)
        }
        JobsCommand::Get { kind, id } => {
            let id = JobId::from(id.as_str());
            with_queue!(queues, *kind, |queue| {
                let item = queue.get(&id).await?;
                output::print_item(&item, format);
                Ok(())
            })
        }
        JobsCommand::Stats => {
            let rows: Vec<StatsRow> = queues
                .stats()
                .await?
                .into_iter()
                .map(|(kind, stats)| StatsRow {
                    kind: kind.to_string(),
                    partition: kind.partition().to_string(),
                    total: stats.total,
                    pending: stats.pending,
                    processing: stats.processing,
                    succeeded: stats.succeeded,
                    failed: stats.failed,
                })
                .collect();
            output::print_list(&rows, format);
            Ok(())
        }
        JobsCommand::Clear { kind, yes } => {
            let partition = JobKind::from(*kind).partition();
            if !yes {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete every job in '{}'?", partition))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;
                if !confirmed {
                    output::print_warning("Aborted, nothing was deleted");
                    return Ok(());
                }
            }
            with_queue!(queues, *kind, |queue| queue.clear().await)?;
            output::print_success(&format!("Cleared '{}'", partition));
            Ok(())
        }
        JobsCommand::Reset { kind, id } => {
            let id = JobId::from(id.as_str());
            with_queue!(queues, *kind, |queue| {
                queue.update_status(&id, JobStatus::Pending).await?;
                Ok::<(), AppError>(())
            })?;
            output::print_success(&format!("Job {} reset to {}", id, JobStatus::Pending));
            Ok(())
        }
        JobsCommand::RequeueStuck { kind } => {
            let ids = with_queue!(queues, *kind, |queue| queue.requeue_processing().await)?;
            match format {
                OutputFormat::Json => output::print_json(&ids),
                OutputFormat::Table => {
                    for id in &ids {
                        println!("  {}", id);
                    }
                    output::print_success(&format!("{} job(s) requeued", ids.len()));
                }
            }
            Ok(())
        }
        JobsCommand::PushFetch { url, name, folder } => {
            let job = FetchJob::new(url.as_str(), name.as_str(), folder.as_str());
            let job = queues.fetch.push(job).await?;
            print_pushed(&job, format);
            Ok(())
        }
        JobsCommand::PushPublish { path, name } => {
            let job = PublishJob::new(path.as_str(), display_name(path, name.as_deref()));
            let job = queues.publish.push(job).await?;
            print_pushed(&job, format);
            Ok(())
        }
        JobsCommand::PushUnpublish { path, name } => {
            let job = UnpublishJob::new(path.as_str(), display_name(path, name.as_deref()));
            let job = queues.unpublish.push(job).await?;
            print_pushed(&job, format);
            Ok(())
        }
        JobsCommand::PushDelete { path, name } => {
            let job = DeleteJob::new(path.as_str(), display_name(path, name.as_deref()));
            let job = queues.delete.push(job).await?;
            print_pushed(&job, format);
            Ok(())
        }
    }
}

async fn list<T: QueueItem>(
    queue: &GenericQueue<T>,
    status: Option<JobStatus>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let items: Vec<T> = queue
        .all()
        .await?
        .into_iter()
        .filter(|item| status.is_none_or(|s| item.status() == s))
        .collect();

    match format {
        OutputFormat::Json => output::print_json(&items),
        OutputFormat::Table => {
            let rows: Vec<JobRow> = items
                .iter()
                .map(|item| JobRow {
                    id: item.id().to_string(),
                    status: item.status().to_string(),
                    target: item.describe(),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }
    Ok(())
}

fn print_pushed<T: QueueItem>(job: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(job),
        OutputFormat::Table => output::print_success(&format!(
            "{} job queued (id: {})",
            T::KIND,
            job.id()
        )),
    }
}

fn parse_status(raw: &str) -> Result<JobStatus, AppError> {
    raw.parse().map_err(AppError::validation)
}

/// Last non-empty path segment, used when no display name is given.
fn display_name(path: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => name.to_string(),
        None => path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}
