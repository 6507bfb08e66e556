//! # issue-search
//!
//! The issue search index, backed by Tantivy.
//!
//! The synchronizer only talks to the index through the [`IndexStore`]
//! trait: a bulk call that reports success or failure per item, plus an
//! id lookup by branch used for group deletes. Two implementations exist:
//! - [`IssueIndex`]: persistent Tantivy index in an `MmapDirectory`
//! - [`InMemoryIndexStore`]: map-backed fake for unit tests
//!
//! Both can be put in read-only mode with `lock_writes()`, after which
//! every bulk item fails while reads keep working.

pub mod document;
pub mod error;
pub mod in_memory;
pub mod index;
pub mod schema;
pub mod searcher;
pub mod store;

pub use error::SearchError;
pub use in_memory::InMemoryIndexStore;
pub use index::{IssueIndex, IssueIndexConfig};
pub use schema::{build_issue_schema, IssueSchema};
pub use searcher::{IssueHit, IssueSearcher, SearchOptions};
pub use store::{BulkItemResponse, BulkRequest, DocRef, IndexStore};
