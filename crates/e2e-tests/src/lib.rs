//! End-to-end test infrastructure for issue-sync.
//!
//! Provides a shared TestHarness over a real RocksDB store and a real
//! Tantivy index in a temp directory, with a manual clock.

use std::sync::Arc;

use issue_indexing::{IndexingResult, IssueIndexer, RecoveryConfig, RecoveryIndexer};
use issue_search::{IssueIndex, IssueIndexConfig};
use issue_storage::Storage;
use issue_types::{IssueRow, ManualClock, QueueItem};

/// 2024-01-29T15:00:00Z
pub const BASE_TIME_MS: i64 = 1_706_540_400_000;

pub const MINUTE_MS: i64 = 60 * 1000;

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub storage: Arc<Storage>,
    pub index: Arc<IssueIndex>,
    pub clock: Arc<ManualClock>,
    pub indexer: Arc<IssueIndexer>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage = Arc::new(
            Storage::open(&temp_dir.path().join("db")).expect("Failed to open test storage"),
        );
        let index_path = temp_dir.path().join("issue-index");
        std::fs::create_dir_all(&index_path).expect("Failed to create index dir");
        let index = Arc::new(
            IssueIndex::open_or_create(IssueIndexConfig::new(index_path))
                .expect("Failed to open test index"),
        );
        let clock = Arc::new(ManualClock::new(BASE_TIME_MS));
        let indexer = Arc::new(IssueIndexer::new(
            storage.clone(),
            index.clone(),
            clock.clone(),
        ));

        Self {
            _temp_dir: temp_dir,
            storage,
            index,
            clock,
            indexer,
        }
    }

    /// Recovery runner with the default loop limit.
    pub fn recovery(&self, min_age_ms: i64) -> RecoveryIndexer {
        self.recovery_with(RecoveryConfig {
            min_age_ms,
            ..Default::default()
        })
    }

    pub fn recovery_with(&self, config: RecoveryConfig) -> RecoveryIndexer {
        RecoveryIndexer::new(self.storage.clone(), self.clock.clone(), config)
            .with_indexer(self.indexer.clone())
    }

    /// Store rows and index them in the same call, as a domain write does.
    pub fn insert_and_index(&self, rows: &[IssueRow]) -> IndexingResult {
        let mut tx = self.storage.begin();
        for row in rows {
            tx.put_issue(row).expect("Failed to stage issue");
        }
        self.indexer
            .commit_and_index(tx, rows)
            .expect("Failed to commit issues")
    }

    /// Store rows without touching the index.
    pub fn insert_rows(&self, rows: &[IssueRow]) {
        self.storage
            .insert_issues(rows)
            .expect("Failed to insert issues");
    }

    /// Every queue item, oldest first.
    pub fn queued(&self) -> Vec<QueueItem> {
        self.storage
            .select_for_recovery(i64::MAX, usize::MAX)
            .expect("Failed to read queue")
    }

    /// Keys of every indexed document, sorted.
    pub fn indexed_keys(&self) -> Vec<String> {
        self.index
            .documents()
            .expect("Failed to read index")
            .into_iter()
            .map(|doc| doc.key)
            .collect()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// `count` issues on one branch of a project, keyed `{prefix}-{n}`.
pub fn create_issues(project_uuid: &str, branch_uuid: &str, prefix: &str, count: usize) -> Vec<IssueRow> {
    (0..count)
        .map(|n| {
            IssueRow::new(format!("{}-{}", prefix, n), project_uuid, format!("{}-file-{}", branch_uuid, n % 3))
                .on_branch(branch_uuid)
                .with_file_path(format!("src/main/java/Foo{}.java", n))
                .with_message(format!("Issue number {}", n))
        })
        .collect()
}
