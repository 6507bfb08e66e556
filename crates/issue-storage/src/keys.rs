//! Key encoding and decoding for storage layer.
//!
//! - Branch index keys: `br:{branch_uuid}:{issue_key}`, so a prefix scan on
//!   `br:{branch_uuid}:` lists every issue of a branch.
//! - Queue keys: `esq:{created_at_ms:013}:{uuid}`, so a forward scan walks
//!   the queue oldest first.

use crate::error::StorageError;
use issue_types::QueueItem;

/// Key of an entry in the branch -> issue index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchIssueKey {
    pub branch_uuid: String,
    pub issue_key: String,
}

impl BranchIssueKey {
    pub fn new(branch_uuid: impl Into<String>, issue_key: impl Into<String>) -> Self {
        Self {
            branch_uuid: branch_uuid.into(),
            issue_key: issue_key.into(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("br:{}:{}", self.branch_uuid, self.issue_key).into_bytes()
    }

    /// Prefix shared by every entry of a branch
    pub fn branch_prefix(branch_uuid: &str) -> Vec<u8> {
        format!("br:{}:", branch_uuid).into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes).map_err(|e| StorageError::invalid_key("branch", e))?;

        let (branch_uuid, issue_key) = s
            .strip_prefix("br:")
            .and_then(|rest| rest.split_once(':'))
            .ok_or_else(|| StorageError::invalid_key("branch", s))?;

        Ok(Self::new(branch_uuid, issue_key))
    }
}

/// Key of a recovery queue item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKey {
    /// Enqueue time, clamped to zero for ordering
    pub created_at_ms: i64,
    pub uuid: String,
}

impl QueueKey {
    pub fn new(created_at_ms: i64, uuid: impl Into<String>) -> Self {
        Self {
            created_at_ms: created_at_ms.max(0),
            uuid: uuid.into(),
        }
    }

    pub fn for_item(item: &QueueItem) -> Self {
        Self::new(item.created_at_ms, item.uuid.as_str())
    }

    /// Encode key to bytes
    /// Format: "esq:{created_at_ms:013}:{uuid}"
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("esq:{:013}:{}", self.created_at_ms, self.uuid).into_bytes()
    }

    /// First key strictly after every item created at or before `ms`
    pub fn upper_bound(ms: i64) -> Vec<u8> {
        format!("esq:{:013};", ms.max(0)).into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes).map_err(|e| StorageError::invalid_key("queue", e))?;

        let parts: Vec<&str> = s.splitn(3, ':').collect();
        if parts.len() != 3 || parts[0] != "esq" {
            return Err(StorageError::invalid_key("queue", s));
        }

        let created_at_ms: i64 = parts[1]
            .parse()
            .map_err(|e| StorageError::invalid_key("queue", format!("bad timestamp in {}: {}", s, e)))?;

        Ok(Self::new(created_at_ms, parts[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_key_roundtrip() {
        let key = BranchIssueKey::new("B1", "AX-12");
        let decoded = BranchIssueKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(key, decoded);
        assert!(key.to_bytes().starts_with(&BranchIssueKey::branch_prefix("B1")));
    }

    #[test]
    fn test_branch_prefix_does_not_match_longer_branch() {
        let key = BranchIssueKey::new("B10", "I1");
        assert!(!key.to_bytes().starts_with(&BranchIssueKey::branch_prefix("B1")));
    }

    #[test]
    fn test_queue_key_time_order() {
        let older = QueueKey::new(999, "ZZZ");
        let newer = QueueKey::new(1_000, "AAA");
        assert!(older.to_bytes() < newer.to_bytes());
    }

    #[test]
    fn test_queue_upper_bound_includes_same_millisecond() {
        let key = QueueKey::new(1_000, "01HZZZZZZZZZZZZZZZZZZZZZZZ");
        assert!(key.to_bytes() < QueueKey::upper_bound(1_000));
        assert!(QueueKey::new(1_001, "0").to_bytes() > QueueKey::upper_bound(1_000));
    }

    #[test]
    fn test_queue_key_rejects_garbage() {
        assert!(QueueKey::from_bytes(b"evt:123").is_err());
        assert!(QueueKey::from_bytes(b"esq:abc:uuid").is_err());
    }
}
