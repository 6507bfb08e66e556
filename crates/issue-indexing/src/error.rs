//! Error types for the indexing layer.

use issue_search::SearchError;
use issue_storage::StorageError;
use thiserror::Error;

/// Errors that can occur while synchronizing the index
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Storage operation failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Search index operation failed outside a bulk call
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Some documents of a fail-fast operation were not written
    #[error(
        "Unrecoverable indexation failures: {failures} errors among {total} requests. \
         Check search index logs for further details."
    )]
    Unrecoverable { failures: u64, total: u64 },
}

impl From<serde_json::Error> for IndexingError {
    fn from(err: serde_json::Error) -> Self {
        IndexingError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecoverable_message() {
        let err = IndexingError::Unrecoverable {
            failures: 2,
            total: 3,
        };
        assert_eq!(
            err.to_string(),
            "Unrecoverable indexation failures: 2 errors among 3 requests. \
             Check search index logs for further details."
        );
    }

    #[test]
    fn test_from_storage_error() {
        let err: IndexingError = StorageError::ColumnFamilyNotFound("es_queue".to_string()).into();
        assert!(matches!(err, IndexingError::Storage(_)));
        assert!(err.to_string().contains("es_queue"));
    }

    #[test]
    fn test_from_serde_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: IndexingError = json_err.into();
        assert!(matches!(err, IndexingError::Serialization(_)));
    }
}
