//! Predefined jobs of the issue-sync daemon.
//!
//! - **recovery**: replays the recovery queue into the search index
//! - **compaction**: RocksDB compaction

pub mod compaction;
pub mod recovery;

pub use compaction::{create_compaction_job, run_compaction, CompactionJobConfig};
pub use recovery::{create_recovery_job, run_recovery, RecoveryJobConfig};
