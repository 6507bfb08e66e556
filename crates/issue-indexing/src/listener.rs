//! Callbacks fired by [`BulkIndexer`](crate::BulkIndexer) while a bulk runs.
//!
//! The listener decides what a failure means: fail-fast listeners turn
//! any failure into an error, resilient listeners remove the queue items
//! of what was written and leave the rest for the recovery runner.

use std::collections::HashMap;

use issue_search::DocRef;
use issue_storage::Storage;
use issue_types::QueueItem;
use tracing::{debug, warn};

use crate::error::IndexingError;
use crate::result::IndexingResult;

pub trait IndexingListener {
    /// Called after each bulk call with the documents it wrote.
    fn on_success(&mut self, docs: &[DocRef]);

    /// Called once when the bulk indexer stops.
    fn on_finish(&mut self, result: &IndexingResult) -> Result<(), IndexingError>;
}

/// Fails the whole operation if any request failed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailOnError;

impl IndexingListener for FailOnError {
    fn on_success(&mut self, _docs: &[DocRef]) {}

    fn on_finish(&mut self, result: &IndexingResult) -> Result<(), IndexingError> {
        if result.is_success() {
            Ok(())
        } else {
            Err(IndexingError::Unrecoverable {
                failures: result.failures(),
                total: result.total(),
            })
        }
    }
}

/// One queue item per document: each written document releases every
/// queue item that targets it.
pub struct OneToOneResilient<'a> {
    storage: &'a Storage,
    items_by_doc_id: HashMap<String, Vec<QueueItem>>,
}

impl<'a> OneToOneResilient<'a> {
    pub fn new(storage: &'a Storage, items: &[QueueItem]) -> Self {
        let mut items_by_doc_id: HashMap<String, Vec<QueueItem>> = HashMap::new();
        for item in items {
            items_by_doc_id
                .entry(item.doc_id.clone())
                .or_default()
                .push(item.clone());
        }
        Self {
            storage,
            items_by_doc_id,
        }
    }
}

impl IndexingListener for OneToOneResilient<'_> {
    fn on_success(&mut self, docs: &[DocRef]) {
        let released: Vec<QueueItem> = docs
            .iter()
            .filter_map(|doc| self.items_by_doc_id.remove(&doc.id))
            .flatten()
            .collect();
        if released.is_empty() {
            return;
        }
        // A failed delete only means the item is replayed later.
        match self.storage.delete_queue_items(&released) {
            Ok(count) => debug!(count, "Released queue items"),
            Err(e) => warn!(error = %e, count = released.len(), "Failed to release queue items"),
        }
    }

    fn on_finish(&mut self, _result: &IndexingResult) -> Result<(), IndexingError> {
        Ok(())
    }
}

/// Many documents per queue item: the items are released only when every
/// request of the bulk succeeded.
pub struct OneToManyResilient<'a> {
    storage: &'a Storage,
    items: Vec<QueueItem>,
}

impl<'a> OneToManyResilient<'a> {
    pub fn new(storage: &'a Storage, items: &[QueueItem]) -> Self {
        Self {
            storage,
            items: items.to_vec(),
        }
    }
}

impl IndexingListener for OneToManyResilient<'_> {
    fn on_success(&mut self, _docs: &[DocRef]) {}

    fn on_finish(&mut self, result: &IndexingResult) -> Result<(), IndexingError> {
        if result.is_success() && !self.items.is_empty() {
            if let Err(e) = self.storage.delete_queue_items(&self.items) {
                warn!(error = %e, count = self.items.len(), "Failed to release queue items");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issue_types::{DocIdType, TYPE_ISSUE};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        (dir, storage)
    }

    fn item(doc_id: &str, id_type: DocIdType, created_at_ms: i64) -> QueueItem {
        QueueItem::new(TYPE_ISSUE, doc_id, id_type, None, created_at_ms)
    }

    fn doc(id: &str) -> DocRef {
        DocRef {
            id: id.to_string(),
            routing: None,
        }
    }

    #[test]
    fn test_fail_on_error() {
        let mut listener = FailOnError;
        assert!(listener.on_finish(&IndexingResult::from_counts(3, 0)).is_ok());

        let err = listener
            .on_finish(&IndexingResult::from_counts(1, 2))
            .unwrap_err();
        assert!(matches!(
            err,
            IndexingError::Unrecoverable {
                failures: 2,
                total: 3
            }
        ));
    }

    #[test]
    fn test_one_to_one_releases_all_items_of_written_doc() {
        let (_dir, storage) = setup();
        let items = vec![
            item("I1", DocIdType::IssueKey, 1),
            item("I1", DocIdType::IssueKey, 2),
            item("I2", DocIdType::IssueKey, 3),
        ];
        storage.enqueue(&items).unwrap();

        let mut listener = OneToOneResilient::new(&storage, &items);
        listener.on_success(&[doc("I1")]);
        listener
            .on_finish(&IndexingResult::from_counts(1, 1))
            .unwrap();

        let remaining = storage.select_for_recovery(i64::MAX, 10).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].doc_id, "I2");
    }

    #[test]
    fn test_one_to_many_keeps_items_on_partial_failure() {
        let (_dir, storage) = setup();
        let items = vec![item("B1", DocIdType::BranchUuid, 1)];
        storage.enqueue(&items).unwrap();

        let mut listener = OneToManyResilient::new(&storage, &items);
        listener.on_success(&[doc("I1")]);
        listener
            .on_finish(&IndexingResult::from_counts(1, 1))
            .unwrap();
        assert_eq!(storage.queue_size().unwrap(), 1);

        listener
            .on_finish(&IndexingResult::from_counts(2, 0))
            .unwrap();
        assert_eq!(storage.queue_size().unwrap(), 0);
    }
}
