//! Atomic multi-key writes.
//!
//! A transaction collects issue writes and queue items into one RocksDB
//! `WriteBatch`. This is what lets a domain change and its recovery intent
//! become durable together: either both are visible after `commit`, or
//! neither is.
//!
//! Reads made while staging (to maintain the branch index) see committed
//! state only, not earlier writes of the same transaction.

use rocksdb::WriteBatch;
use tracing::debug;

use crate::column_families::{CF_ES_QUEUE, CF_ISSUES, CF_ISSUES_BY_BRANCH};
use crate::db::Storage;
use crate::error::StorageError;
use crate::keys::{BranchIssueKey, QueueKey};
use issue_types::{IssueRow, QueueItem};

pub struct StorageTransaction<'a> {
    storage: &'a Storage,
    batch: WriteBatch,
    operations: usize,
}

impl<'a> StorageTransaction<'a> {
    pub(crate) fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            batch: WriteBatch::default(),
            operations: 0,
        }
    }

    /// Stage an insert or update of an issue row.
    pub fn put_issue(&mut self, row: &IssueRow) -> Result<(), StorageError> {
        let issues_cf = self.storage.cf(CF_ISSUES)?;
        let index_cf = self.storage.cf(CF_ISSUES_BY_BRANCH)?;

        if let Some(previous) = self.storage.get_issue(&row.key)? {
            if previous.branch_uuid != row.branch_uuid {
                self.batch.delete_cf(
                    &index_cf,
                    BranchIssueKey::new(previous.branch_uuid, previous.key).to_bytes(),
                );
            }
        }

        self.batch.put_cf(&issues_cf, row.key.as_bytes(), row.to_bytes()?);
        self.batch.put_cf(
            &index_cf,
            BranchIssueKey::new(row.branch_uuid.as_str(), row.key.as_str()).to_bytes(),
            b"",
        );
        self.operations += 1;
        Ok(())
    }

    /// Stage the removal of an issue. Returns `false` if it does not exist.
    pub fn delete_issue(&mut self, key: &str) -> Result<bool, StorageError> {
        let Some(previous) = self.storage.get_issue(key)? else {
            return Ok(false);
        };

        let issues_cf = self.storage.cf(CF_ISSUES)?;
        let index_cf = self.storage.cf(CF_ISSUES_BY_BRANCH)?;
        self.batch.delete_cf(&issues_cf, key.as_bytes());
        self.batch.delete_cf(
            &index_cf,
            BranchIssueKey::new(previous.branch_uuid, previous.key).to_bytes(),
        );
        self.operations += 1;
        Ok(true)
    }

    /// Stage a recovery queue item.
    pub fn enqueue(&mut self, item: &QueueItem) -> Result<(), StorageError> {
        let queue_cf = self.storage.cf(CF_ES_QUEUE)?;
        self.batch
            .put_cf(&queue_cf, QueueKey::for_item(item).to_bytes(), item.to_bytes()?);
        self.operations += 1;
        Ok(())
    }

    /// Number of staged operations.
    pub fn len(&self) -> usize {
        self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations == 0
    }

    /// Write every staged operation atomically.
    pub fn commit(self) -> Result<(), StorageError> {
        if self.operations == 0 {
            return Ok(());
        }
        let operations = self.operations;
        self.storage.db.write(self.batch)?;
        debug!(operations, "Committed storage transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issue_types::{DocIdType, TYPE_ISSUE};
    use tempfile::TempDir;

    fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_commit_writes_rows_and_queue_together() {
        let (storage, _temp) = create_test_storage();
        let row = IssueRow::new("I1", "P1", "F1");

        let mut tx = storage.begin();
        tx.put_issue(&row).unwrap();
        tx.enqueue(&QueueItem::new(TYPE_ISSUE, "I1", DocIdType::IssueKey, None, 10))
            .unwrap();
        assert_eq!(tx.len(), 2);

        assert!(!storage.issue_exists("I1").unwrap());
        assert_eq!(storage.queue_size().unwrap(), 0);

        tx.commit().unwrap();

        assert!(storage.issue_exists("I1").unwrap());
        assert_eq!(storage.queue_size().unwrap(), 1);
    }

    #[test]
    fn test_dropped_transaction_writes_nothing() {
        let (storage, _temp) = create_test_storage();

        {
            let mut tx = storage.begin();
            tx.put_issue(&IssueRow::new("I1", "P1", "F1")).unwrap();
            tx.enqueue(&QueueItem::new(TYPE_ISSUE, "I1", DocIdType::IssueKey, None, 10))
                .unwrap();
        }

        assert!(!storage.issue_exists("I1").unwrap());
        assert_eq!(storage.queue_size().unwrap(), 0);
    }

    #[test]
    fn test_delete_missing_issue_is_not_staged() {
        let (storage, _temp) = create_test_storage();
        let mut tx = storage.begin();
        assert!(!tx.delete_issue("I1").unwrap());
        assert!(tx.is_empty());
        tx.commit().unwrap();
    }
}
