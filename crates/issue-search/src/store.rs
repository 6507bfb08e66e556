//! The bulk write contract of an index store.

use issue_types::IssueDoc;

use crate::error::SearchError;

/// One operation of a bulk call.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkRequest {
    /// Insert or replace a document
    Index(IssueDoc),
    /// Delete a document by id
    Delete { id: String, routing: Option<String> },
}

impl BulkRequest {
    pub fn delete(id: impl Into<String>, routing: Option<String>) -> Self {
        BulkRequest::Delete {
            id: id.into(),
            routing,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            BulkRequest::Index(doc) => &doc.key,
            BulkRequest::Delete { id, .. } => id,
        }
    }

    pub fn routing(&self) -> Option<&str> {
        match self {
            BulkRequest::Index(doc) => Some(doc.routing()),
            BulkRequest::Delete { routing, .. } => routing.as_deref(),
        }
    }
}

/// Outcome of one bulk item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResponse {
    pub id: String,
    pub routing: Option<String>,
    /// `None` when the item succeeded
    pub failure: Option<String>,
}

impl BulkItemResponse {
    pub fn success(request: &BulkRequest) -> Self {
        Self {
            id: request.id().to_string(),
            routing: request.routing().map(str::to_string),
            failure: None,
        }
    }

    pub fn failed(request: &BulkRequest, reason: impl Into<String>) -> Self {
        Self {
            id: request.id().to_string(),
            routing: request.routing().map(str::to_string),
            failure: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Id and routing of an indexed document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocRef {
    pub id: String,
    pub routing: Option<String>,
}

/// Document store the synchronizer writes to.
///
/// `bulk` returns one response per request, in request order. An `Err`
/// means the call itself failed and no item can be assumed written.
pub trait IndexStore: Send + Sync {
    fn bulk(&self, requests: &[BulkRequest]) -> Result<Vec<BulkItemResponse>, SearchError>;

    /// Ids of every document of a branch.
    fn ids_by_branch(&self, branch_uuid: &str) -> Result<Vec<DocRef>, SearchError>;
}

/// Message used for items rejected by a write-locked store.
pub(crate) fn write_blocked_reason(index: &str) -> String {
    format!("index [{}] blocked: FORBIDDEN/8/index write (api)", index)
}
