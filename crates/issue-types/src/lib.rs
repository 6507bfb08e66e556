//! # issue-types
//!
//! Shared domain types for the issue-sync system.
//!
//! This crate defines the data structures every other crate agrees on:
//! - Issues: authoritative rows owned by the primary store
//! - Issue documents: typed projections written to the search index
//! - Queue items: durable recovery instructions for the `es_queue`
//! - Security: SANS Top 25 and SonarSource categories derived from CWEs
//! - Clock: injectable time source for recovery thresholds
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use issue_types::{IssueDoc, IssueRow};
//!
//! let row = IssueRow::new("AX-1", "proj-1", "file-1");
//! let doc = IssueDoc::from_row(&row);
//! assert_eq!(doc.key, "AX-1");
//! ```

pub mod clock;
pub mod config;
pub mod doc;
pub mod error;
pub mod issue;
pub mod queue;
pub mod security;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{IndexingSettings, RecoverySettings, Settings};
pub use doc::{IndexType, IssueDoc, IssueScope, TYPE_ISSUE};
pub use error::SyncError;
pub use issue::{IssueRow, IssueType, QUALIFIER_FILE, QUALIFIER_UNIT_TEST_FILE};
pub use queue::{DocIdType, QueueItem};
pub use security::{SqCategory, VulnerabilityProbability};
