//! RocksDB wrapper for issue-sync storage.
//!
//! Provides:
//! - Database open with column family setup
//! - Issue reads: by key, by branch, full scan
//! - Recovery queue selection and deletion
//! - Admin operations (flush, compact, stats)
//!
//! Writes that must be atomic go through [`StorageTransaction`].

use std::path::Path;

use rocksdb::{ColumnFamily, Direction, IteratorMode, Options, WriteBatch, DB};
use tracing::{debug, error, info};

use crate::column_families::{
    build_cf_descriptors, ALL_CF_NAMES, CF_ES_QUEUE, CF_ISSUES, CF_ISSUES_BY_BRANCH,
};
use crate::error::StorageError;
use crate::keys::{BranchIssueKey, QueueKey};
use crate::transaction::StorageTransaction;
use issue_types::{IssueRow, QueueItem};

/// Main storage interface for issue-sync
pub struct Storage {
    pub(crate) db: DB,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let db = DB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())?;

        Ok(Self { db })
    }

    pub(crate) fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    /// Start a write transaction.
    ///
    /// Nothing is visible until [`StorageTransaction::commit`]; dropping the
    /// transaction discards it.
    pub fn begin(&self) -> StorageTransaction<'_> {
        StorageTransaction::new(self)
    }

    // ==================== Issue Methods ====================

    pub fn get_issue(&self, key: &str) -> Result<Option<IssueRow>, StorageError> {
        let cf = self.cf(CF_ISSUES)?;
        match self.db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => Ok(Some(IssueRow::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn issue_exists(&self, key: &str) -> Result<bool, StorageError> {
        let cf = self.cf(CF_ISSUES)?;
        Ok(self.db.get_pinned_cf(&cf, key.as_bytes())?.is_some())
    }

    /// Load the issues that still exist among `keys`, in input order.
    pub fn issues_by_keys(&self, keys: &[String]) -> Result<Vec<IssueRow>, StorageError> {
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(row) = self.get_issue(key)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Iterate over every issue in key order.
    pub fn scan_issues(
        &self,
    ) -> Result<impl Iterator<Item = Result<IssueRow, StorageError>> + '_, StorageError> {
        let cf = self.cf(CF_ISSUES)?;
        let iter = self.db.iterator_cf(&cf, IteratorMode::Start);
        Ok(iter.map(|item| {
            let (_, value) = item?;
            Ok(IssueRow::from_bytes(&value)?)
        }))
    }

    /// Load every issue of a branch.
    pub fn scan_branch(&self, branch_uuid: &str) -> Result<Vec<IssueRow>, StorageError> {
        let index_cf = self.cf(CF_ISSUES_BY_BRANCH)?;
        let prefix = BranchIssueKey::branch_prefix(branch_uuid);

        let iter = self
            .db
            .iterator_cf(&index_cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut rows = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let index_key = BranchIssueKey::from_bytes(&key)?;
            // The row is authoritative; skip index entries it no longer agrees with.
            if let Some(row) = self.get_issue(&index_key.issue_key)? {
                if row.branch_uuid == branch_uuid {
                    rows.push(row);
                }
            }
        }

        debug!(branch = %branch_uuid, count = rows.len(), "Scanned branch issues");
        Ok(rows)
    }

    pub fn branch_has_issues(&self, branch_uuid: &str) -> Result<bool, StorageError> {
        Ok(!self.scan_branch(branch_uuid)?.is_empty())
    }

    /// Insert or replace issues in one atomic batch, without queueing.
    pub fn insert_issues(&self, rows: &[IssueRow]) -> Result<(), StorageError> {
        let mut tx = self.begin();
        for row in rows {
            tx.put_issue(row)?;
        }
        tx.commit()
    }

    /// Delete issues in one atomic batch. Returns how many existed.
    pub fn delete_issues(&self, keys: &[String]) -> Result<usize, StorageError> {
        let mut tx = self.begin();
        let mut deleted = 0;
        for key in keys {
            if tx.delete_issue(key)? {
                deleted += 1;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }

    pub fn issue_count(&self) -> Result<u64, StorageError> {
        self.count_cf_entries(self.cf(CF_ISSUES)?)
    }

    // ==================== Recovery Queue Methods ====================

    /// Enqueue items outside any domain transaction.
    pub fn enqueue(&self, items: &[QueueItem]) -> Result<(), StorageError> {
        let mut tx = self.begin();
        for item in items {
            tx.enqueue(item)?;
        }
        tx.commit()
    }

    /// Select up to `limit` queue items created at or before `before_ms`,
    /// oldest first.
    pub fn select_for_recovery(
        &self,
        before_ms: i64,
        limit: usize,
    ) -> Result<Vec<QueueItem>, StorageError> {
        let cf = self.cf(CF_ES_QUEUE)?;
        let upper = QueueKey::upper_bound(before_ms);

        let mut items = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            if items.len() >= limit {
                break;
            }
            let (key, value) = item?;
            if key.as_ref() >= upper.as_slice() {
                break;
            }
            match QueueItem::from_bytes(&value) {
                Ok(queue_item) => items.push(queue_item),
                Err(e) => error!(
                    key = %String::from_utf8_lossy(&key),
                    error = %e,
                    "Malformed es_queue item left in queue, manual fix required"
                ),
            }
        }

        Ok(items)
    }

    /// Delete queue items. Items already gone are ignored.
    ///
    /// Returns the number of delete operations written.
    pub fn delete_queue_items(&self, items: &[QueueItem]) -> Result<usize, StorageError> {
        if items.is_empty() {
            return Ok(0);
        }

        let cf = self.cf(CF_ES_QUEUE)?;
        let mut batch = WriteBatch::default();
        for item in items {
            batch.delete_cf(&cf, QueueKey::for_item(item).to_bytes());
        }
        self.db.write(batch)?;

        debug!(count = items.len(), "Deleted queue items");
        Ok(items.len())
    }

    pub fn queue_size(&self) -> Result<u64, StorageError> {
        self.count_cf_entries(self.cf(CF_ES_QUEUE)?)
    }

    // ===== Admin Operations =====

    /// Flush all column families to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(&cf)?;
            }
        }
        Ok(())
    }

    /// Trigger manual compaction on all column families.
    pub fn compact(&self) -> Result<(), StorageError> {
        info!("Starting full compaction...");
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.compact_range_cf::<&[u8], &[u8]>(&cf, None, None);
            }
        }
        info!("Compaction complete");
        Ok(())
    }

    /// Trigger compaction on a specific column family.
    pub fn compact_cf(&self, cf_name: &str) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        info!(cf = %cf_name, "Starting compaction...");
        self.db.compact_range_cf::<&[u8], &[u8]>(&cf, None, None);
        info!(cf = %cf_name, "Compaction complete");
        Ok(())
    }

    pub fn get_stats(&self) -> Result<StorageStats, StorageError> {
        Ok(StorageStats {
            issue_count: self.issue_count()?,
            branch_index_count: self.count_cf_entries(self.cf(CF_ISSUES_BY_BRANCH)?)?,
            queue_count: self.queue_size()?,
            disk_usage_bytes: self.get_disk_usage(),
        })
    }

    fn count_cf_entries(&self, cf: &ColumnFamily) -> Result<u64, StorageError> {
        let mut count = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn get_disk_usage(&self) -> u64 {
        std::fs::read_dir(self.db.path())
            .map(|entries| {
                entries
                    .flatten()
                    .filter_map(|entry| entry.metadata().ok())
                    .map(|metadata| metadata.len())
                    .sum()
            })
            .unwrap_or(0)
    }
}

/// Statistics about the storage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StorageStats {
    pub issue_count: u64,
    pub branch_index_count: u64,
    /// Items waiting in the recovery queue
    pub queue_count: u64,
    pub disk_usage_bytes: u64,
}
