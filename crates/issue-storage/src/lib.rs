//! Primary store for issue-sync.
//!
//! Provides RocksDB-backed storage with:
//! - Issue rows keyed by issue key
//! - A per-branch secondary index for group scans
//! - The recovery queue (`es_queue`), ordered by enqueue time
//! - Transactions that commit rows and queue items in one atomic batch

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;
pub mod transaction;

pub use db::{Storage, StorageStats};
pub use error::StorageError;
pub use keys::{BranchIssueKey, QueueKey};
pub use transaction::StorageTransaction;
