//! The durable store handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use heed::types::{Bytes, Str};
use heed::{Env, EnvOpenOptions};
use tracing::{info, warn};

use s3browser_core::config::StoreConfig;
use s3browser_core::error::AppError;
use s3browser_core::result::AppResult;

use crate::txn::{Partition, ReadTxn, WriteTxn, db_error};

/// Headroom for named databases beyond the partitions requested at open.
const EXTRA_DBS: u32 = 4;

/// A single LMDB environment holding one named database per partition.
///
/// Partitions are created on open if absent. Transactions are scoped to a
/// single partition; opening one on a partition the store was not opened
/// with fails with `PARTITION_NOT_FOUND`.
pub struct DurableStore {
    env: Env,
    partitions: HashMap<String, Partition>,
    path: PathBuf,
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("path", &self.path)
            .field("partitions", &self.partitions())
            .finish_non_exhaustive()
    }
}

impl DurableStore {
    /// Open (or create) the store at `config.path` and ensure every named
    /// partition exists.
    ///
    /// Opening is retried `config.open_attempts` times with a growing
    /// backoff; exhaustion yields `STORE_UNAVAILABLE`. This blocks the
    /// calling thread.
    pub fn open(config: &StoreConfig, partitions: &[&str]) -> AppResult<Self> {
        let path = PathBuf::from(&config.path);
        let attempts = config.open_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match Self::try_open(&path, config, partitions) {
                Ok(store) => {
                    info!(
                        path = %path.display(),
                        partitions = partitions.len(),
                        "Durable store opened"
                    );
                    return Ok(store);
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        attempt,
                        attempts,
                        error = %e,
                        "Failed to open durable store"
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        std::thread::sleep(config.backoff_after(attempt));
                    }
                }
            }
        }

        let reason = last_error.map(|e| e.message).unwrap_or_default();
        Err(AppError::store_unavailable(format!(
            "Failed to open store at '{}' after {attempts} attempts: {reason}",
            path.display()
        )))
    }

    fn try_open(path: &Path, config: &StoreConfig, partitions: &[&str]) -> AppResult<Self> {
        std::fs::create_dir_all(path).map_err(|e| {
            AppError::database(format!(
                "Failed to create store directory '{}': {e}",
                path.display()
            ))
        })?;

        let max_dbs = u32::try_from(partitions.len())
            .unwrap_or(u32::MAX - EXTRA_DBS)
            .saturating_add(EXTRA_DBS);

        // SAFETY: the environment directory is only opened through this type,
        // once per process, and is not modified by anything but LMDB.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(config.map_size_bytes())
                .max_dbs(max_dbs)
                .open(path)
        }
        .map_err(|e| db_error("Failed to open environment", e))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| db_error("Failed to begin setup transaction", e))?;
        let mut handles = HashMap::with_capacity(partitions.len());
        for &name in partitions {
            let db = env
                .create_database::<Str, Bytes>(&mut wtxn, Some(name))
                .map_err(|e| db_error(&format!("Failed to create partition '{name}'"), e))?;
            handles.insert(name.to_string(), db);
        }
        wtxn.commit()
            .map_err(|e| db_error("Failed to commit setup transaction", e))?;

        Ok(Self {
            env,
            partitions: handles,
            path: path.to_path_buf(),
        })
    }

    /// Directory the environment lives in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all partitions, sorted.
    pub fn partitions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.partitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether the store was opened with `partition`.
    pub fn has_partition(&self, partition: &str) -> bool {
        self.partitions.contains_key(partition)
    }

    fn partition(&self, partition: &str) -> AppResult<(&str, Partition)> {
        self.partitions
            .get_key_value(partition)
            .map(|(name, db)| (name.as_str(), *db))
            .ok_or_else(|| AppError::partition_not_found(partition))
    }

    /// Begin a read-only snapshot of `partition`.
    pub fn read(&self, partition: &str) -> AppResult<ReadTxn<'_>> {
        let (name, db) = self.partition(partition)?;
        let txn = self
            .env
            .read_txn()
            .map_err(|e| db_error("Failed to begin read transaction", e))?;
        Ok(ReadTxn::new(txn, db, name))
    }

    /// Begin an exclusive write transaction on `partition`.
    ///
    /// Blocks while another write transaction is open.
    pub fn write(&self, partition: &str) -> AppResult<WriteTxn<'_>> {
        let (name, db) = self.partition(partition)?;
        let txn = self
            .env
            .write_txn()
            .map_err(|e| db_error("Failed to begin write transaction", e))?;
        Ok(WriteTxn::new(txn, db, name))
    }

    /// Run `f` against a read snapshot of `partition`.
    pub fn with_read<R>(
        &self,
        partition: &str,
        f: impl FnOnce(&ReadTxn<'_>) -> AppResult<R>,
    ) -> AppResult<R> {
        let txn = self.read(partition)?;
        let out = f(&txn)?;
        txn.finish()?;
        Ok(out)
    }

    /// Run `f` in a write transaction on `partition`.
    ///
    /// The transaction commits when `f` returns `Ok` and is rolled back
    /// when it returns `Err`.
    pub fn with_write<R>(
        &self,
        partition: &str,
        f: impl FnOnce(&mut WriteTxn<'_>) -> AppResult<R>,
    ) -> AppResult<R> {
        let mut txn = self.write(partition)?;
        let out = f(&mut txn)?;
        txn.commit()?;
        Ok(out)
    }

    /// Flush and close the environment, waiting for it to be released.
    pub fn close(self) {
        let path = self.path;
        self.env.prepare_for_closing().wait();
        info!(path = %path.display(), "Durable store closed");
    }
}
