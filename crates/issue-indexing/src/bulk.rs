//! Buffered bulk writes to an index store.

use issue_search::{BulkRequest, DocRef, IndexStore};
use issue_types::IndexingSettings;
use tracing::{debug, error, warn};

use crate::error::IndexingError;
use crate::listener::IndexingListener;
use crate::result::IndexingResult;

/// Number of requests buffered before a bulk call is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkSize {
    /// Incremental writes
    Regular,
    /// Full reindex
    Large,
}

impl BulkSize {
    pub fn requests(&self, settings: &IndexingSettings) -> usize {
        let size = match self {
            BulkSize::Regular => settings.regular_bulk_size,
            BulkSize::Large => settings.large_bulk_size,
        };
        size.max(1)
    }
}

/// Buffers requests and sends them in bulks.
///
/// Every item outcome is counted in an [`IndexingResult`] and written
/// documents are reported to the listener after each bulk call. `stop`
/// flushes what is left and hands the result to the listener, which may
/// turn failures into an error.
pub struct BulkIndexer<'a> {
    store: &'a dyn IndexStore,
    bulk_size: usize,
    listener: Box<dyn IndexingListener + 'a>,
    buffer: Vec<BulkRequest>,
    result: IndexingResult,
}

impl<'a> BulkIndexer<'a> {
    pub fn new(
        store: &'a dyn IndexStore,
        bulk_size: usize,
        listener: Box<dyn IndexingListener + 'a>,
    ) -> Self {
        let bulk_size = bulk_size.max(1);
        Self {
            store,
            bulk_size,
            listener,
            buffer: Vec::with_capacity(bulk_size),
            result: IndexingResult::new(),
        }
    }

    pub fn add(&mut self, request: BulkRequest) {
        self.buffer.push(request);
        if self.buffer.len() >= self.bulk_size {
            self.flush();
        }
    }

    pub fn add_deletion(&mut self, id: impl Into<String>, routing: Option<String>) {
        self.add(BulkRequest::delete(id, routing));
    }

    /// Delete every indexed document of a branch.
    ///
    /// If the ids cannot be listed, one failure is recorded so that the
    /// operation is not reported as successful.
    pub fn add_deletion_by_branch(&mut self, branch_uuid: &str) {
        match self.store.ids_by_branch(branch_uuid) {
            Ok(refs) => {
                debug!(branch = %branch_uuid, count = refs.len(), "Deleting branch documents");
                for doc in refs {
                    self.add(BulkRequest::delete(doc.id, doc.routing));
                }
            }
            Err(e) => {
                error!(branch = %branch_uuid, error = %e, "Failed to list branch documents");
                self.result.add_failure();
            }
        }
    }

    /// Number of requests waiting for the next bulk call.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Flush remaining requests and finish.
    pub fn stop(mut self) -> Result<IndexingResult, IndexingError> {
        self.flush();
        self.listener.on_finish(&self.result)?;
        Ok(self.result)
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let requests = std::mem::take(&mut self.buffer);

        let written: Vec<DocRef> = match self.store.bulk(&requests) {
            Ok(responses) => responses
                .into_iter()
                .filter_map(|response| match response.failure {
                    None => {
                        self.result.add_success();
                        Some(DocRef {
                            id: response.id,
                            routing: response.routing,
                        })
                    }
                    Some(reason) => {
                        warn!(id = %response.id, reason = %reason, "Bulk item failed");
                        self.result.add_failure();
                        None
                    }
                })
                .collect(),
            Err(e) => {
                error!(error = %e, requests = requests.len(), "Bulk call failed");
                self.result.add_failures(requests.len() as u64);
                Vec::new()
            }
        };

        if !written.is_empty() {
            self.listener.on_success(&written);
        }
        self.buffer = Vec::with_capacity(self.bulk_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::FailOnError;
    use issue_search::InMemoryIndexStore;
    use issue_types::{IssueDoc, IssueRow};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn doc(key: &str, branch: &str) -> IssueDoc {
        IssueDoc::from_row(&IssueRow::new(key, "P1", "F1").on_branch(branch))
    }

    #[derive(Default)]
    struct Recorder {
        written: Rc<RefCell<Vec<String>>>,
    }

    impl IndexingListener for Recorder {
        fn on_success(&mut self, docs: &[DocRef]) {
            self.written
                .borrow_mut()
                .extend(docs.iter().map(|d| d.id.clone()));
        }

        fn on_finish(&mut self, _result: &IndexingResult) -> Result<(), IndexingError> {
            Ok(())
        }
    }

    #[test]
    fn test_flushes_at_bulk_size() {
        let store = InMemoryIndexStore::new();
        let mut bulk = BulkIndexer::new(&store, 2, Box::new(FailOnError));

        bulk.add(BulkRequest::Index(doc("I1", "B1")));
        assert_eq!(bulk.pending(), 1);
        bulk.add(BulkRequest::Index(doc("I2", "B1")));
        assert_eq!(bulk.pending(), 0);
        bulk.add(BulkRequest::Index(doc("I3", "B1")));

        let result = bulk.stop().unwrap();
        assert_eq!(result.total(), 3);
        assert_eq!(store.bulk_calls(), 2);
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn test_listener_sees_written_docs() {
        let store = InMemoryIndexStore::new();
        let written = Rc::new(RefCell::new(Vec::new()));
        let listener = Recorder {
            written: Rc::clone(&written),
        };
        let mut bulk = BulkIndexer::new(&store, 10, Box::new(listener));
        bulk.add(BulkRequest::Index(doc("I1", "B1")));
        bulk.add_deletion("I2", Some("P1".to_string()));
        bulk.stop().unwrap();

        assert_eq!(*written.borrow(), vec!["I1".to_string(), "I2".to_string()]);
    }

    #[test]
    fn test_write_locked_store_fails_every_item() {
        let store = InMemoryIndexStore::new();
        store.lock_writes();
        let mut bulk = BulkIndexer::new(&store, 10, Box::new(FailOnError));
        bulk.add(BulkRequest::Index(doc("I1", "B1")));
        bulk.add(BulkRequest::Index(doc("I2", "B1")));

        let err = bulk.stop().unwrap_err();
        assert!(matches!(
            err,
            IndexingError::Unrecoverable {
                failures: 2,
                total: 2
            }
        ));
    }

    #[test]
    fn test_call_failure_counts_every_item() {
        let store = InMemoryIndexStore::new();
        store.set_unavailable(true);
        let written = Rc::new(RefCell::new(Vec::new()));
        let listener = Recorder {
            written: Rc::clone(&written),
        };
        let mut bulk = BulkIndexer::new(&store, 10, Box::new(listener));
        bulk.add(BulkRequest::Index(doc("I1", "B1")));
        bulk.add(BulkRequest::Index(doc("I2", "B1")));
        bulk.add(BulkRequest::Index(doc("I3", "B1")));

        let result = bulk.stop().unwrap();
        assert_eq!(result, IndexingResult::from_counts(0, 3));
        assert!(written.borrow().is_empty());
    }

    #[test]
    fn test_deletion_by_branch() {
        let store = InMemoryIndexStore::new();
        store.put_documents([doc("I1", "B1"), doc("I2", "B1"), doc("I3", "B2")]);

        let mut bulk = BulkIndexer::new(&store, 10, Box::new(FailOnError));
        bulk.add_deletion_by_branch("B1");
        let result = bulk.stop().unwrap();

        assert_eq!(result.total(), 2);
        assert_eq!(store.count(), 1);
        assert!(store.get_document("I3").is_some());
    }

    #[test]
    fn test_deletion_by_branch_when_unavailable() {
        let store = InMemoryIndexStore::new();
        store.set_unavailable(true);
        let mut bulk = BulkIndexer::new(&store, 10, Box::new(FailOnError));
        bulk.add_deletion_by_branch("B1");
        assert!(bulk.stop().is_err());
    }

    #[test]
    fn test_bulk_size_from_settings() {
        let settings = IndexingSettings::default();
        assert_eq!(BulkSize::Regular.requests(&settings), 500);
        assert_eq!(BulkSize::Large.requests(&settings), 5000);
    }
}
