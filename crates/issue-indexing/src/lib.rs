//! # issue-indexing
//!
//! Synchronizes the issue search index with the issue rows.
//!
//! ## Key Components
//!
//! - [`IssueIndexer`]: every write path to the issue index
//! - [`RecoveryIndexer`]: replays the recovery queue on a schedule
//! - [`BulkIndexer`]: buffered bulk writes with per-item accounting
//! - [`IndexingListener`]: what to do with written and failed documents
//! - [`IndexingResult`]: request, success and failure counters
//!
//! ## Architecture
//!
//! ```text
//! StorageTransaction (rows + queue items)
//!        |
//!        v  commit
//! IssueIndexer --bulk--> IndexStore
//!        |                    ^
//!        | failures stay      |
//!        v  queued            |
//! RecoveryIndexer ------------+
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use issue_indexing::{IssueIndexer, RecoveryConfig, RecoveryIndexer};
//!
//! let indexer = Arc::new(IssueIndexer::new(storage.clone(), index, clock.clone()));
//!
//! let mut tx = storage.begin();
//! tx.put_issue(&row)?;
//! let result = indexer.commit_and_index(tx, &[row])?;
//!
//! let recovery = RecoveryIndexer::new(storage, clock, RecoveryConfig::default())
//!     .with_indexer(indexer);
//! recovery.recover_now()?;
//! ```

pub mod bulk;
pub mod cause;
pub mod error;
pub mod indexer;
pub mod issue_indexer;
pub mod listener;
pub mod recovery;
pub mod result;

pub use bulk::{BulkIndexer, BulkSize};
pub use cause::ProjectIndexerCause;
pub use error::IndexingError;
pub use indexer::{ResilientIndexer, StartupIndexer};
pub use issue_indexer::IssueIndexer;
pub use listener::{FailOnError, IndexingListener, OneToManyResilient, OneToOneResilient};
pub use recovery::{RecoveryConfig, RecoveryIndexer, CIRCUIT_BREAKER_RATIO};
pub use result::IndexingResult;
