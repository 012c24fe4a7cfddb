//! Scoped transaction handles over a single partition.

use heed::types::{Bytes, Str};
use heed::{Database, RoTxn, RwTxn};

use s3browser_core::error::{AppError, ErrorKind};
use s3browser_core::result::AppResult;

/// A partition: string keys mapped to raw record bytes, in key order.
pub(crate) type Partition = Database<Str, Bytes>;

/// Map a heed error into the application error space.
pub(crate) fn db_error(context: &str, err: heed::Error) -> AppError {
    AppError::with_source(ErrorKind::Database, format!("{context}: {err}"), err)
}

/// Read-only snapshot of one partition.
///
/// Concurrent writers never tear what this handle sees.
pub struct ReadTxn<'s> {
    txn: RoTxn<'s>,
    db: Partition,
    partition: &'s str,
}

impl<'s> ReadTxn<'s> {
    pub(crate) fn new(txn: RoTxn<'s>, db: Partition, partition: &'s str) -> Self {
        Self { txn, db, partition }
    }

    /// Name of the partition this transaction addresses.
    pub fn partition(&self) -> &str {
        self.partition
    }

    /// Point lookup.
    pub fn get(&self, key: &str) -> AppResult<Option<&[u8]>> {
        self.db
            .get(&self.txn, key)
            .map_err(|e| db_error("Failed to read key", e))
    }

    /// Number of entries in the partition.
    pub fn len(&self) -> AppResult<u64> {
        self.db
            .len(&self.txn)
            .map_err(|e| db_error("Failed to count entries", e))
    }

    /// Whether the partition is empty.
    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> AppResult<impl Iterator<Item = AppResult<(&str, &[u8])>>> {
        let iter = self
            .db
            .iter(&self.txn)
            .map_err(|e| db_error("Failed to open cursor", e))?;
        Ok(iter.map(|entry| entry.map_err(|e| db_error("Failed to read entry", e))))
    }

    /// End the snapshot.
    pub fn finish(self) -> AppResult<()> {
        self.txn
            .commit()
            .map_err(|e| db_error("Failed to end read transaction", e))
    }
}

/// Exclusive read-write transaction on one partition.
///
/// Only one write transaction is open store-wide at a time. Mutations
/// become visible on [`WriteTxn::commit`]; dropping the handle without
/// committing aborts every mutation made through it.
pub struct WriteTxn<'s> {
    txn: RwTxn<'s>,
    db: Partition,
    partition: &'s str,
}

impl<'s> WriteTxn<'s> {
    pub(crate) fn new(txn: RwTxn<'s>, db: Partition, partition: &'s str) -> Self {
        Self { txn, db, partition }
    }

    /// Name of the partition this transaction addresses.
    pub fn partition(&self) -> &str {
        self.partition
    }

    /// Point lookup, including this transaction's uncommitted writes.
    pub fn get(&self, key: &str) -> AppResult<Option<&[u8]>> {
        self.db
            .get(&self.txn, key)
            .map_err(|e| db_error("Failed to read key", e))
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> AppResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> AppResult<impl Iterator<Item = AppResult<(&str, &[u8])>>> {
        let iter = self
            .db
            .iter(&self.txn)
            .map_err(|e| db_error("Failed to open cursor", e))?;
        Ok(iter.map(|entry| entry.map_err(|e| db_error("Failed to read entry", e))))
    }

    /// Insert or overwrite `key`.
    pub fn put(&mut self, key: &str, value: &[u8]) -> AppResult<()> {
        self.db
            .put(&mut self.txn, key, value)
            .map_err(|e| db_error("Failed to write key", e))
    }

    /// Remove `key`; returns whether it was present.
    pub fn delete(&mut self, key: &str) -> AppResult<bool> {
        self.db
            .delete(&mut self.txn, key)
            .map_err(|e| db_error("Failed to delete key", e))
    }

    /// Remove every entry of the partition.
    pub fn clear(&mut self) -> AppResult<()> {
        self.db
            .clear(&mut self.txn)
            .map_err(|e| db_error("Failed to clear partition", e))
    }

    /// Make all mutations durable and visible.
    pub fn commit(self) -> AppResult<()> {
        self.txn
            .commit()
            .map_err(|e| db_error("Failed to commit transaction", e))
    }

    /// Discard all mutations.
    pub fn abort(self) {
        self.txn.abort();
    }
}
