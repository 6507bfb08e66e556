//! Column family definitions for RocksDB.
//!
//! - issues: issue rows keyed by issue key (Zstd compressed)
//! - issues_by_branch: empty-valued `br:{branch}:{issue}` index entries
//! - es_queue: recovery queue items keyed by enqueue time

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for issue rows
pub const CF_ISSUES: &str = "issues";

/// Column family name for the branch -> issue index
pub const CF_ISSUES_BY_BRANCH: &str = "issues_by_branch";

/// Column family name for the recovery queue
pub const CF_ES_QUEUE: &str = "es_queue";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_ISSUES, CF_ISSUES_BY_BRANCH, CF_ES_QUEUE];

fn issues_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_ISSUES, issues_options()),
        ColumnFamilyDescriptor::new(CF_ISSUES_BY_BRANCH, Options::default()),
        ColumnFamilyDescriptor::new(CF_ES_QUEUE, Options::default()),
    ]
}
