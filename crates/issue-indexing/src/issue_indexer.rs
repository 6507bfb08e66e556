//! Keeps the issue index in sync with the issue rows.
//!
//! Writes that may be lost go through the recovery queue: queue items are
//! committed with the domain change, the index is written right away, and
//! whatever was written is removed from the queue. Anything left behind is
//! replayed by [`RecoveryIndexer`](crate::RecoveryIndexer).
//!
//! Full reindex, analysis reindex and direct deletes do not use the queue
//! and fail on the first unwritten document.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use issue_search::{BulkRequest, IndexStore};
use issue_storage::{Storage, StorageTransaction};
use issue_types::{
    Clock, DocIdType, IndexType, IndexingSettings, IssueDoc, IssueRow, QueueItem, TYPE_ISSUE,
};
use tracing::{debug, error, info, warn};

use crate::bulk::{BulkIndexer, BulkSize};
use crate::cause::ProjectIndexerCause;
use crate::error::IndexingError;
use crate::indexer::{ResilientIndexer, StartupIndexer};
use crate::listener::{FailOnError, IndexingListener, OneToManyResilient, OneToOneResilient};
use crate::result::IndexingResult;

pub struct IssueIndexer {
    storage: Arc<Storage>,
    store: Arc<dyn IndexStore>,
    clock: Arc<dyn Clock>,
    settings: IndexingSettings,
}

impl IssueIndexer {
    pub fn new(storage: Arc<Storage>, store: Arc<dyn IndexStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_settings(storage, store, clock, IndexingSettings::default())
    }

    pub fn with_settings(
        storage: Arc<Storage>,
        store: Arc<dyn IndexStore>,
        clock: Arc<dyn Clock>,
        settings: IndexingSettings,
    ) -> Self {
        Self {
            storage,
            store,
            clock,
            settings,
        }
    }

    /// Reindex every issue.
    pub fn index_all(&self) -> Result<IndexingResult, IndexingError> {
        let mut bulk = self.bulk_indexer(BulkSize::Large, Box::new(FailOnError));
        for row in self.storage.scan_issues()? {
            bulk.add(BulkRequest::Index(IssueDoc::from_row(&row?)));
        }
        let result = bulk.stop()?;
        info!(total = result.total(), "Indexed all issues");
        Ok(result)
    }

    /// Commit `tx` together with one queue item per issue, then index the
    /// issues.
    ///
    /// Issues that no longer exist once `tx` is committed are deleted from
    /// the index. Index failures never surface as an error: they are
    /// counted in the result and the queue items stay for recovery. Only a
    /// failed commit is returned as an error.
    pub fn commit_and_index(
        &self,
        mut tx: StorageTransaction<'_>,
        issues: &[IssueRow],
    ) -> Result<IndexingResult, IndexingError> {
        let now = self.clock.now_ms();
        let items: Vec<QueueItem> = issues
            .iter()
            .map(|issue| {
                QueueItem::new(
                    TYPE_ISSUE,
                    issue.key.as_str(),
                    DocIdType::IssueKey,
                    Some(issue.project_uuid.clone()),
                    now,
                )
            })
            .collect();
        for item in &items {
            tx.enqueue(item)?;
        }
        self.commit_and_index_items(tx, &items)
    }

    /// Commit `tx`, which must already contain `items`, then index them.
    pub fn commit_and_index_items(
        &self,
        tx: StorageTransaction<'_>,
        items: &[QueueItem],
    ) -> Result<IndexingResult, IndexingError> {
        tx.commit()?;
        Ok(self.index_committed(items))
    }

    /// Stage the queue items needed to resync `branch_uuids` after `cause`.
    ///
    /// Returns the staged items, empty when `cause` leaves issue documents
    /// untouched.
    pub fn prepare_for_recovery(
        &self,
        tx: &mut StorageTransaction<'_>,
        branch_uuids: &[String],
        cause: ProjectIndexerCause,
    ) -> Result<Vec<QueueItem>, IndexingError> {
        if !cause.affects_issues() {
            return Ok(Vec::new());
        }
        let now = self.clock.now_ms();
        let items: Vec<QueueItem> = branch_uuids
            .iter()
            .map(|branch| {
                QueueItem::new(
                    TYPE_ISSUE,
                    branch.as_str(),
                    DocIdType::BranchUuid,
                    Some(branch.clone()),
                    now,
                )
            })
            .collect();
        for item in &items {
            tx.enqueue(item)?;
        }
        Ok(items)
    }

    /// Resync every issue document of a branch after `cause`.
    pub fn reindex_branch(
        &self,
        branch_uuid: &str,
        cause: ProjectIndexerCause,
    ) -> Result<IndexingResult, IndexingError> {
        let mut tx = self.storage.begin();
        let items = self.prepare_for_recovery(&mut tx, &[branch_uuid.to_string()], cause)?;
        if items.is_empty() {
            debug!(branch = %branch_uuid, cause = %cause, "Nothing to reindex");
            return Ok(IndexingResult::new());
        }
        self.commit_and_index_items(tx, &items)
    }

    /// Upsert every issue of a branch after an analysis.
    pub fn index_on_analysis(&self, branch_uuid: &str) -> Result<IndexingResult, IndexingError> {
        self.index_on_analysis_except(branch_uuid, &HashSet::new())
    }

    /// Upsert the issues of a branch, skipping those of unchanged
    /// components.
    pub fn index_on_analysis_except(
        &self,
        branch_uuid: &str,
        unchanged_components: &HashSet<String>,
    ) -> Result<IndexingResult, IndexingError> {
        let rows = self.storage.scan_branch(branch_uuid)?;
        let mut bulk = self.bulk_indexer(BulkSize::Regular, Box::new(FailOnError));
        for row in rows
            .iter()
            .filter(|row| !unchanged_components.contains(&row.component_uuid))
        {
            bulk.add(BulkRequest::Index(IssueDoc::from_row(row)));
        }
        let result = bulk.stop()?;
        info!(branch = %branch_uuid, total = result.total(), "Indexed branch issues");
        Ok(result)
    }

    /// Delete issue documents of a project.
    pub fn delete_by_keys(
        &self,
        project_uuid: &str,
        issue_keys: &[String],
    ) -> Result<IndexingResult, IndexingError> {
        if issue_keys.is_empty() {
            return Ok(IndexingResult::new());
        }
        let mut bulk = self.bulk_indexer(BulkSize::Regular, Box::new(FailOnError));
        for key in issue_keys {
            bulk.add_deletion(key.as_str(), Some(project_uuid.to_string()));
        }
        bulk.stop()
    }

    fn bulk_indexer<'a>(
        &'a self,
        size: BulkSize,
        listener: Box<dyn IndexingListener + 'a>,
    ) -> BulkIndexer<'a> {
        BulkIndexer::new(self.store.as_ref(), size.requests(&self.settings), listener)
    }

    /// Index freshly committed items. Errors are downgraded to failures
    /// since the items are already safe in the queue.
    fn index_committed(&self, items: &[QueueItem]) -> IndexingResult {
        match self.index(items) {
            Ok(result) => {
                if !result.is_success() {
                    warn!(
                        failures = result.failures(),
                        total = result.total(),
                        "Issues left for recovery"
                    );
                }
                result
            }
            Err(e) => {
                warn!(error = %e, items = items.len(), "Indexing failed, issues left for recovery");
                IndexingResult::from_counts(0, items.len() as u64)
            }
        }
    }

    fn index_issue_items(&self, items: &[QueueItem]) -> Result<IndexingResult, IndexingError> {
        if items.is_empty() {
            return Ok(IndexingResult::new());
        }

        let mut routing_by_key: HashMap<&str, Option<String>> = HashMap::new();
        for item in items {
            routing_by_key
                .entry(item.doc_id.as_str())
                .or_insert_with(|| item.doc_routing.clone());
        }
        let mut keys: Vec<String> = routing_by_key.keys().map(|k| k.to_string()).collect();
        keys.sort();

        let rows = self.storage.issues_by_keys(&keys)?;
        let found: HashSet<&str> = rows.iter().map(|row| row.key.as_str()).collect();

        let listener = OneToOneResilient::new(&self.storage, items);
        let mut bulk = self.bulk_indexer(BulkSize::Regular, Box::new(listener));
        for row in &rows {
            bulk.add(BulkRequest::Index(IssueDoc::from_row(row)));
        }
        for key in keys.iter().filter(|key| !found.contains(key.as_str())) {
            let routing = routing_by_key.get(key.as_str()).cloned().flatten();
            bulk.add_deletion(key.as_str(), routing);
        }
        bulk.stop()
    }

    fn index_branch_items(&self, items: &[QueueItem]) -> Result<IndexingResult, IndexingError> {
        let mut items_by_branch: BTreeMap<&str, Vec<QueueItem>> = BTreeMap::new();
        for item in items {
            items_by_branch
                .entry(item.doc_id.as_str())
                .or_default()
                .push(item.clone());
        }

        let mut result = IndexingResult::new();
        for (branch_uuid, branch_items) in items_by_branch {
            let rows = self.storage.scan_branch(branch_uuid)?;
            let listener = OneToManyResilient::new(&self.storage, &branch_items);
            let mut bulk = self.bulk_indexer(BulkSize::Regular, Box::new(listener));
            // Every document of the branch is deleted, then live rows are
            // written back after their own delete.
            bulk.add_deletion_by_branch(branch_uuid);
            for row in &rows {
                bulk.add(BulkRequest::Index(IssueDoc::from_row(row)));
            }
            let branch_result = bulk.stop()?;
            debug!(
                branch = %branch_uuid,
                rows = rows.len(),
                total = branch_result.total(),
                failures = branch_result.failures(),
                "Recovered branch"
            );
            result.merge(&branch_result);
        }
        Ok(result)
    }
}

impl ResilientIndexer for IssueIndexer {
    fn index_types(&self) -> Vec<IndexType> {
        vec![TYPE_ISSUE]
    }

    fn index(&self, items: &[QueueItem]) -> Result<IndexingResult, IndexingError> {
        let mut result = IndexingResult::new();
        let mut issue_items = Vec::new();
        let mut branch_items = Vec::new();

        for item in items {
            match item.id_type() {
                Some(DocIdType::IssueKey) => issue_items.push(item.clone()),
                Some(DocIdType::BranchUuid) => branch_items.push(item.clone()),
                None => {
                    error!(
                        "Unsupported es_queue.doc_id_type for issues. Manual fix is required: {}",
                        item
                    );
                    result.add_failure();
                }
            }
        }

        result.merge(&self.index_issue_items(&issue_items)?);
        result.merge(&self.index_branch_items(&branch_items)?);
        Ok(result)
    }
}

impl StartupIndexer for IssueIndexer {
    fn index_on_startup(&self) -> Result<IndexingResult, IndexingError> {
        self.index_all()
    }
}
