//! Replays the recovery queue.
//!
//! Only items older than `min_age_ms` are replayed, so that a write still
//! in flight is not raced by its own recovery. A pass reads the queue in
//! batches of `loop_limit` items and stops early when a batch mostly
//! fails: the index is probably down and the next scheduled pass will try
//! again.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use issue_storage::Storage;
use issue_types::{Clock, QueueItem, RecoverySettings};
use tracing::{debug, error, info};

use crate::error::IndexingError;
use crate::indexer::ResilientIndexer;
use crate::result::IndexingResult;

/// A batch with a success ratio at or below this value ends the pass.
pub const CIRCUIT_BREAKER_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Minimum age of an item before it is replayed
    pub min_age_ms: i64,
    /// Maximum number of items read per batch
    pub loop_limit: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            min_age_ms: 5 * 60 * 1000,
            loop_limit: 10_000,
        }
    }
}

impl From<&RecoverySettings> for RecoveryConfig {
    fn from(settings: &RecoverySettings) -> Self {
        Self {
            min_age_ms: settings.min_age_ms,
            loop_limit: settings.loop_limit,
        }
    }
}

pub struct RecoveryIndexer {
    storage: Arc<Storage>,
    clock: Arc<dyn Clock>,
    config: RecoveryConfig,
    indexers: HashMap<String, Arc<dyn ResilientIndexer>>,
}

impl RecoveryIndexer {
    pub fn new(storage: Arc<Storage>, clock: Arc<dyn Clock>, config: RecoveryConfig) -> Self {
        Self {
            storage,
            clock,
            config,
            indexers: HashMap::new(),
        }
    }

    /// Route items of every type handled by `indexer` to it.
    pub fn with_indexer(mut self, indexer: Arc<dyn ResilientIndexer>) -> Self {
        for index_type in indexer.index_types() {
            self.indexers.insert(index_type.format(), Arc::clone(&indexer));
        }
        self
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Replay up to `batch_size` items created at or before `before_ms`.
    pub fn recover(
        &self,
        before_ms: i64,
        batch_size: usize,
    ) -> Result<IndexingResult, IndexingError> {
        let items = self.storage.select_for_recovery(before_ms, batch_size)?;
        self.recover_items(&items)
    }

    /// Run one full recovery pass.
    pub fn recover_now(&self) -> Result<IndexingResult, IndexingError> {
        let before_ms = self.clock.now_ms() - self.config.min_age_ms;
        let limit = self.config.loop_limit;
        let mut result = IndexingResult::new();

        loop {
            let items = self.storage.select_for_recovery(before_ms, limit)?;
            if items.is_empty() {
                break;
            }
            let batch = self.recover_items(&items)?;
            result.merge(&batch);

            if batch.success_ratio() <= CIRCUIT_BREAKER_RATIO {
                error!(
                    failures = batch.failures(),
                    total = batch.total(),
                    "Recovery stopped after too many failures, waiting for next run"
                );
                break;
            }
            // A short batch means every eligible item has been tried.
            if batch.total() == 0 || items.len() < limit {
                break;
            }
        }

        if result.total() > 0 {
            info!(
                total = result.total(),
                failures = result.failures(),
                "Recovery processed documents"
            );
        }
        Ok(result)
    }

    fn recover_items(&self, items: &[QueueItem]) -> Result<IndexingResult, IndexingError> {
        let mut items_by_type: BTreeMap<&str, Vec<QueueItem>> = BTreeMap::new();
        for item in items {
            items_by_type
                .entry(item.doc_type.as_str())
                .or_default()
                .push(item.clone());
        }

        let mut result = IndexingResult::new();
        for (doc_type, type_items) in items_by_type {
            match self.indexers.get(doc_type) {
                Some(indexer) => {
                    debug!(doc_type, count = type_items.len(), "Recovering items");
                    result.merge(&indexer.index(&type_items)?);
                }
                None => {
                    error!(
                        doc_type,
                        count = type_items.len(),
                        "Recovery ignored items with unsupported type"
                    );
                    result.add_failures(type_items.len() as u64);
                }
            }
        }
        Ok(result)
    }
}
