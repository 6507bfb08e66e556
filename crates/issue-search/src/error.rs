//! Search error types.

use thiserror::Error;

/// Errors that can occur during index operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// Query parse error
    #[error("Query parse error: {0}")]
    QueryParse(#[from] tantivy::query::QueryParserError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Schema mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Writer mutex is poisoned
    #[error("Index is locked: {0}")]
    IndexLocked(String),

    /// The whole call failed before any item was processed
    #[error("Index unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}
