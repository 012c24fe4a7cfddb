//! # s3browser-store
//!
//! The durable store behind the job queues: one LMDB environment file with
//! a named database ("partition") per job kind. Write transactions are
//! serialized store-wide, readers see a consistent snapshot, and a write
//! transaction that is dropped without [`WriteTxn::commit`] is aborted.

pub mod store;
pub mod txn;

pub use store::DurableStore;
pub use txn::{ReadTxn, WriteTxn};
