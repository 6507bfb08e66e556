//! Map-backed [`IndexStore`] for tests.
//!
//! Behaves like [`crate::IssueIndex`] for the bulk contract, and can also
//! simulate a call-level outage where `bulk` itself returns an error.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use issue_types::{IssueDoc, TYPE_ISSUE};

use crate::error::SearchError;
use crate::store::{write_blocked_reason, BulkItemResponse, BulkRequest, DocRef, IndexStore};

#[derive(Default)]
pub struct InMemoryIndexStore {
    docs: RwLock<BTreeMap<String, IssueDoc>>,
    write_locked: AtomicBool,
    unavailable: AtomicBool,
    bulk_calls: AtomicUsize,
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_writes(&self) {
        self.write_locked.store(true, Ordering::SeqCst);
    }

    pub fn unlock_writes(&self) {
        self.write_locked.store(false, Ordering::SeqCst);
    }

    /// Make every bulk call fail as a whole until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of bulk calls received, including failed ones.
    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    /// Store documents directly, bypassing locks.
    pub fn put_documents(&self, docs: impl IntoIterator<Item = IssueDoc>) {
        let mut map = self.docs.write().unwrap_or_else(|e| e.into_inner());
        for doc in docs {
            map.insert(doc.key.clone(), doc);
        }
    }

    pub fn get_document(&self, id: &str) -> Option<IssueDoc> {
        self.docs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Every document, sorted by key.
    pub fn documents(&self) -> Vec<IssueDoc> {
        self.docs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.docs.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl IndexStore for InMemoryIndexStore {
    fn bulk(&self, requests: &[BulkRequest]) -> Result<Vec<BulkItemResponse>, SearchError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SearchError::Unavailable("connection refused".to_string()));
        }

        if self.write_locked.load(Ordering::SeqCst) {
            let reason = write_blocked_reason(TYPE_ISSUE.index);
            return Ok(requests
                .iter()
                .map(|r| BulkItemResponse::failed(r, reason.as_str()))
                .collect());
        }

        let mut docs = self.docs.write().unwrap_or_else(|e| e.into_inner());
        Ok(requests
            .iter()
            .map(|request| {
                match request {
                    BulkRequest::Index(doc) => {
                        docs.insert(doc.key.clone(), doc.clone());
                    }
                    BulkRequest::Delete { id, .. } => {
                        docs.remove(id);
                    }
                }
                BulkItemResponse::success(request)
            })
            .collect())
    }

    fn ids_by_branch(&self, branch_uuid: &str) -> Result<Vec<DocRef>, SearchError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SearchError::Unavailable("connection refused".to_string()));
        }

        Ok(self
            .docs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|doc| doc.branch_uuid == branch_uuid)
            .map(|doc| DocRef {
                id: doc.key.clone(),
                routing: Some(doc.routing().to_string()),
            })
            .collect())
    }
}
