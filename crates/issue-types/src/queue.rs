//! Recovery queue items.
//!
//! A queue item says "this document needs another write or delete attempt".
//! Items are written atomically with the domain change that caused them and
//! removed once the index confirms the write. Several items may target the
//! same document; replaying any of them re-reads the primary store, so the
//! outcome does not depend on which one runs first.

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::doc::IndexType;

/// How `QueueItem::doc_id` must be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocIdType {
    /// `doc_id` is a single issue key
    IssueKey,
    /// `doc_id` is a branch UUID covering every issue of the branch
    BranchUuid,
}

impl DocIdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocIdType::IssueKey => "issueKey",
            DocIdType::BranchUuid => "branchUuid",
        }
    }

    /// Returns `None` for values this version does not know how to recover.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "issueKey" => Some(DocIdType::IssueKey),
            "branchUuid" => Some(DocIdType::BranchUuid),
            _ => None,
        }
    }
}

/// A durable recovery instruction.
///
/// `doc_type` and `doc_id_type` are kept as raw strings so that items
/// written by other versions survive a read and can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Unique identifier (ULID string)
    pub uuid: String,

    /// `index/type` of the target document
    pub doc_type: String,

    pub doc_id: String,

    pub doc_id_type: String,

    /// Parent key used for routing, usually the project UUID
    #[serde(default)]
    pub doc_routing: Option<String>,

    /// Enqueue time in milliseconds since epoch
    pub created_at_ms: i64,
}

impl QueueItem {
    pub fn new(
        index_type: IndexType,
        doc_id: impl Into<String>,
        id_type: DocIdType,
        routing: Option<String>,
        created_at_ms: i64,
    ) -> Self {
        Self::raw(
            index_type.format(),
            doc_id,
            id_type.as_str(),
            routing,
            created_at_ms,
        )
    }

    /// Build an item without validating its type strings.
    pub fn raw(
        doc_type: impl Into<String>,
        doc_id: impl Into<String>,
        doc_id_type: impl Into<String>,
        routing: Option<String>,
        created_at_ms: i64,
    ) -> Self {
        Self {
            uuid: Ulid::new().to_string(),
            doc_type: doc_type.into(),
            doc_id: doc_id.into(),
            doc_id_type: doc_id_type.into(),
            doc_routing: routing,
            created_at_ms,
        }
    }

    pub fn id_type(&self) -> Option<DocIdType> {
        DocIdType::parse(&self.doc_id_type)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl fmt::Display for QueueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QueueItem{{uuid={}, doc_type={}, doc_id={}, doc_id_type={}, doc_routing={}, created_at={}}}",
            self.uuid,
            self.doc_type,
            self.doc_id,
            self.doc_id_type,
            self.doc_routing.as_deref().unwrap_or("null"),
            self.created_at_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::TYPE_ISSUE;

    #[test]
    fn test_new_item_uses_wire_names() {
        let item = QueueItem::new(
            TYPE_ISSUE,
            "I1",
            DocIdType::IssueKey,
            Some("P1".to_string()),
            1_000,
        );
        assert_eq!(item.doc_type, "issues/issue");
        assert_eq!(item.doc_id_type, "issueKey");
        assert_eq!(item.id_type(), Some(DocIdType::IssueKey));
        assert_eq!(item.uuid.len(), 26);
    }

    #[test]
    fn test_unknown_id_type_is_preserved() {
        let item = QueueItem::raw("issues/issue", "I1", "unknown", None, 1_000);
        let decoded = QueueItem::from_bytes(&item.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.doc_id_type, "unknown");
        assert_eq!(decoded.id_type(), None);
    }

    #[test]
    fn test_items_for_same_doc_are_distinct() {
        let a = QueueItem::new(TYPE_ISSUE, "I1", DocIdType::IssueKey, None, 1);
        let b = QueueItem::new(TYPE_ISSUE, "I1", DocIdType::IssueKey, None, 1);
        assert_ne!(a.uuid, b.uuid);
    }

    #[test]
    fn test_display_names_every_field() {
        let item = QueueItem::raw("issues/issue", "I1", "unknown", None, 42);
        let text = item.to_string();
        assert!(text.contains("doc_id=I1"));
        assert!(text.contains("doc_id_type=unknown"));
        assert!(text.contains("doc_routing=null"));
    }
}
