//! Capabilities an indexer exposes to the rest of the system.

use issue_types::{IndexType, QueueItem};

use crate::error::IndexingError;
use crate::result::IndexingResult;

/// An indexer able to replay recovery queue items.
///
/// `index` re-reads the primary store for every item, writes the result
/// and removes the items it could write. Index failures are reported in
/// the result; an `Err` means the primary store could not be read.
pub trait ResilientIndexer: Send + Sync {
    /// Document types whose queue items this indexer handles.
    fn index_types(&self) -> Vec<IndexType>;

    fn index(&self, items: &[QueueItem]) -> Result<IndexingResult, IndexingError>;
}

/// An indexer able to build its documents from scratch.
pub trait StartupIndexer: Send + Sync {
    /// Index every row. Fails if any document could not be written.
    fn index_on_startup(&self) -> Result<IndexingResult, IndexingError>;
}
