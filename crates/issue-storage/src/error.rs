//! Errors raised by the issue store.

use std::fmt::Display;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// The database was opened without one of the issue-sync column families
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    #[error("Malformed {kind} key: {reason}")]
    InvalidKey { kind: &'static str, reason: String },

    /// An issue row or queue item failed to encode or decode
    #[error("Stored value codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn invalid_key(kind: &'static str, reason: impl Display) -> Self {
        StorageError::InvalidKey {
            kind,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_message() {
        let err = StorageError::invalid_key("queue", "esq:abc");
        assert_eq!(err.to_string(), "Malformed queue key: esq:abc");
    }

    #[test]
    fn test_codec_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StorageError = json_err.into();
        assert!(matches!(err, StorageError::Codec(_)));
    }
}
