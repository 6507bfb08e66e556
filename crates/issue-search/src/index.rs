//! Persistent Tantivy issue index.
//!
//! Handles index creation and opening, and implements [`IndexStore`] on
//! top of a single shared `IndexWriter`. Every bulk call is committed
//! before it returns and the reader is reloaded, so a successful item is
//! immediately visible to searches.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tantivy::collector::DocSetCollector;
use tantivy::query::{AllQuery, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info, warn};

use issue_types::{IssueDoc, TYPE_ISSUE};

use crate::document::{doc_to_issue, issue_to_doc};
use crate::error::SearchError;
use crate::schema::{build_issue_schema, IssueSchema};
use crate::store::{write_blocked_reason, BulkItemResponse, BulkRequest, DocRef, IndexStore};

/// Default memory budget for IndexWriter (50MB)
const DEFAULT_WRITER_MEMORY_MB: usize = 50;

/// Issue index configuration
#[derive(Debug, Clone)]
pub struct IssueIndexConfig {
    /// Path to index directory
    pub index_path: PathBuf,
    /// Memory budget for writer in MB
    pub writer_memory_mb: usize,
}

impl Default for IssueIndexConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("./issue-index"),
            writer_memory_mb: DEFAULT_WRITER_MEMORY_MB,
        }
    }
}

impl IssueIndexConfig {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            writer_memory_mb: DEFAULT_WRITER_MEMORY_MB,
        }
    }

    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb;
        self
    }
}

/// The issue index.
pub struct IssueIndex {
    index: Index,
    schema: IssueSchema,
    writer: Arc<Mutex<IndexWriter>>,
    reader: IndexReader,
    write_locked: AtomicBool,
    config: IssueIndexConfig,
}

impl IssueIndex {
    /// Open existing index or create new one.
    pub fn open_or_create(config: IssueIndexConfig) -> Result<Self, SearchError> {
        let index = open_or_create_index(&config.index_path)?;
        let schema = IssueSchema::from_schema(index.schema())?;

        let memory_budget = config.writer_memory_mb * 1024 * 1024;
        let writer: IndexWriter = index.writer(memory_budget)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        info!(path = ?config.index_path, "Opened issue index");

        Ok(Self {
            index,
            schema,
            writer: Arc::new(Mutex::new(writer)),
            reader,
            write_locked: AtomicBool::new(false),
            config,
        })
    }

    pub fn schema(&self) -> &IssueSchema {
        &self.schema
    }

    /// Get the underlying Tantivy index
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Reader kept current by every bulk commit.
    pub fn reader(&self) -> IndexReader {
        self.reader.clone()
    }

    pub fn path(&self) -> &Path {
        &self.config.index_path
    }

    /// Put the index in read-only mode: bulk items fail, reads still work.
    pub fn lock_writes(&self) {
        self.write_locked.store(true, Ordering::SeqCst);
        warn!(index = TYPE_ISSUE.index, "Index writes locked");
    }

    pub fn unlock_writes(&self) {
        self.write_locked.store(false, Ordering::SeqCst);
        info!(index = TYPE_ISSUE.index, "Index writes unlocked");
    }

    pub fn is_write_locked(&self) -> bool {
        self.write_locked.load(Ordering::SeqCst)
    }

    /// Number of live documents.
    pub fn count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    pub fn get_document(&self, id: &str) -> Result<Option<IssueDoc>, SearchError> {
        let query = TermQuery::new(
            Term::from_field_text(self.schema.doc_id, id),
            IndexRecordOption::Basic,
        );
        Ok(self.load_documents(&query)?.into_iter().next())
    }

    /// Every document, sorted by key.
    pub fn documents(&self) -> Result<Vec<IssueDoc>, SearchError> {
        self.load_documents(&AllQuery)
    }

    /// Every document of a branch, sorted by key.
    pub fn documents_by_branch(&self, branch_uuid: &str) -> Result<Vec<IssueDoc>, SearchError> {
        let query = TermQuery::new(
            Term::from_field_text(self.schema.branch_uuid, branch_uuid),
            IndexRecordOption::Basic,
        );
        self.load_documents(&query)
    }

    fn load_documents(&self, query: &dyn Query) -> Result<Vec<IssueDoc>, SearchError> {
        let searcher = self.reader.searcher();
        let addresses = searcher.search(query, &DocSetCollector)?;

        let mut docs = Vec::with_capacity(addresses.len());
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            docs.push(doc_to_issue(&self.schema, &doc)?);
        }
        docs.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(docs)
    }
}

impl IndexStore for IssueIndex {
    fn bulk(&self, requests: &[BulkRequest]) -> Result<Vec<BulkItemResponse>, SearchError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        if self.is_write_locked() {
            let reason = write_blocked_reason(TYPE_ISSUE.index);
            return Ok(requests
                .iter()
                .map(|r| BulkItemResponse::failed(r, reason.as_str()))
                .collect());
        }

        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))?;

        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            let term = Term::from_field_text(self.schema.doc_id, request.id());
            let outcome = match request {
                BulkRequest::Index(issue) => issue_to_doc(&self.schema, issue).and_then(|doc| {
                    writer.delete_term(term);
                    writer.add_document(doc).map(|_| ()).map_err(SearchError::from)
                }),
                BulkRequest::Delete { .. } => {
                    writer.delete_term(term);
                    Ok(())
                }
            };
            responses.push(match outcome {
                Ok(()) => BulkItemResponse::success(request),
                Err(e) => BulkItemResponse::failed(request, e.to_string()),
            });
        }

        if let Err(e) = writer.commit() {
            if let Err(rollback_err) = writer.rollback() {
                warn!(error = %rollback_err, "Rollback after failed commit also failed");
            }
            return Err(e.into());
        }
        drop(writer);

        self.reader.reload()?;
        debug!(requests = requests.len(), "Committed bulk request");
        Ok(responses)
    }

    fn ids_by_branch(&self, branch_uuid: &str) -> Result<Vec<DocRef>, SearchError> {
        let query = TermQuery::new(
            Term::from_field_text(self.schema.branch_uuid, branch_uuid),
            IndexRecordOption::Basic,
        );
        let searcher = self.reader.searcher();
        let addresses = searcher.search(&query, &DocSetCollector)?;

        let mut refs = Vec::with_capacity(addresses.len());
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            let id = doc
                .get_first(self.schema.doc_id)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let routing = doc
                .get_first(self.schema.routing)
                .and_then(|v| v.as_str())
                .map(str::to_string);
            refs.push(DocRef { id, routing });
        }
        refs.sort();
        Ok(refs)
    }
}

/// Open an existing index or create a new one.
///
/// Uses MmapDirectory for persistence.
pub fn open_or_create_index(path: &Path) -> Result<Index, SearchError> {
    if path.join("meta.json").exists() {
        debug!(path = ?path, "Opening existing index");
        Ok(Index::open_in_dir(path)?)
    } else {
        info!(path = ?path, "Creating new index");
        std::fs::create_dir_all(path)?;
        let schema = build_issue_schema();
        Ok(Index::create_in_dir(path, schema.schema().clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issue_types::IssueRow;
    use tempfile::TempDir;

    fn create_test_index() -> (IssueIndex, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let index = IssueIndex::open_or_create(IssueIndexConfig::new(temp_dir.path())).unwrap();
        (index, temp_dir)
    }

    fn doc(key: &str, project: &str) -> IssueDoc {
        IssueDoc::from_row(&IssueRow::new(key, project, "F1"))
    }

    #[test]
    fn test_bulk_index_makes_documents_visible() {
        let (index, _temp) = create_test_index();

        let responses = index
            .bulk(&[
                BulkRequest::Index(doc("I1", "P1")),
                BulkRequest::Index(doc("I2", "P1")),
            ])
            .unwrap();

        assert!(responses.iter().all(|r| r.is_success()));
        assert_eq!(index.count(), 2);
        let loaded = index.get_document("I1").unwrap().unwrap();
        assert_eq!(loaded.project_uuid, "P1");
    }

    #[test]
    fn test_reindexing_same_key_replaces_document() {
        let (index, _temp) = create_test_index();
        index.bulk(&[BulkRequest::Index(doc("I1", "P1"))]).unwrap();

        let mut updated = doc("I1", "P1");
        updated.message = Some("updated".to_string());
        index.bulk(&[BulkRequest::Index(updated)]).unwrap();

        assert_eq!(index.count(), 1);
        let loaded = index.get_document("I1").unwrap().unwrap();
        assert_eq!(loaded.message.as_deref(), Some("updated"));
    }

    #[test]
    fn test_bulk_delete() {
        let (index, _temp) = create_test_index();
        index
            .bulk(&[
                BulkRequest::Index(doc("I1", "P1")),
                BulkRequest::Index(doc("I2", "P1")),
            ])
            .unwrap();

        let responses = index
            .bulk(&[
                BulkRequest::delete("I1", Some("P1".to_string())),
                BulkRequest::delete("missing", None),
            ])
            .unwrap();

        assert!(responses.iter().all(|r| r.is_success()));
        assert_eq!(index.count(), 1);
        assert!(index.get_document("I1").unwrap().is_none());
    }

    #[test]
    fn test_locked_index_fails_every_item_and_keeps_reads() {
        let (index, _temp) = create_test_index();
        index.bulk(&[BulkRequest::Index(doc("I1", "P1"))]).unwrap();

        index.lock_writes();
        let responses = index
            .bulk(&[
                BulkRequest::Index(doc("I2", "P1")),
                BulkRequest::delete("I1", None),
            ])
            .unwrap();

        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(|r| !r.is_success()));
        assert!(responses[0].failure.as_deref().unwrap().contains("blocked"));
        assert_eq!(index.count(), 1);

        index.unlock_writes();
        index.bulk(&[BulkRequest::Index(doc("I2", "P1"))]).unwrap();
        assert_eq!(index.count(), 2);
    }

    #[test]
    fn test_ids_by_branch() {
        let (index, _temp) = create_test_index();
        index
            .bulk(&[
                BulkRequest::Index(doc("I1", "P1")),
                BulkRequest::Index(doc("I2", "P1")),
                BulkRequest::Index(doc("I3", "P2")),
            ])
            .unwrap();

        let refs = index.ids_by_branch("P1").unwrap();
        let ids: Vec<&str> = refs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["I1", "I2"]);
        assert_eq!(refs[0].routing.as_deref(), Some("P1"));
        assert!(index.ids_by_branch("unknown").unwrap().is_empty());
    }

    #[test]
    fn test_documents_by_branch_and_all() {
        let (index, _temp) = create_test_index();
        index
            .bulk(&[
                BulkRequest::Index(doc("I2", "P1")),
                BulkRequest::Index(doc("I1", "P2")),
            ])
            .unwrap();

        let all: Vec<String> = index.documents().unwrap().into_iter().map(|d| d.key).collect();
        assert_eq!(all, vec!["I1", "I2"]);
        assert_eq!(index.documents_by_branch("P2").unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_existing_index() {
        let temp_dir = TempDir::new().unwrap();
        let config = IssueIndexConfig::new(temp_dir.path());
        {
            let index = IssueIndex::open_or_create(config.clone()).unwrap();
            index.bulk(&[BulkRequest::Index(doc("I1", "P1"))]).unwrap();
        }

        let index = IssueIndex::open_or_create(config).unwrap();
        assert_eq!(index.count(), 1);
        assert!(!index.is_write_locked());
    }

    #[test]
    fn test_empty_bulk_is_noop() {
        let (index, _temp) = create_test_index();
        assert!(index.bulk(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_config_with_memory() {
        let config = IssueIndexConfig::new("/tmp/test").with_memory_mb(100);
        assert_eq!(config.writer_memory_mb, 100);
        assert_eq!(IssueIndexConfig::default().index_path, PathBuf::from("./issue-index"));
    }
}
