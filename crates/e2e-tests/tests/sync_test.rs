//! Index synchronization E2E tests.
//!
//! Covers the commit path against a real Tantivy index: full reindex,
//! write-through on commit, write-locked index, recovery of what failed.

use pretty_assertions::assert_eq;

use e2e_tests::{create_issues, TestHarness, MINUTE_MS};
use issue_indexing::{IndexingError, IndexingResult, ResilientIndexer};
use issue_search::IndexStore;
use issue_types::{IssueDoc, IssueRow, IssueScope, IssueType};

#[test]
fn test_index_all_creates_one_document_per_row() {
    let harness = TestHarness::new();
    let mut rows = create_issues("P1", "P1", "main", 7);
    rows.extend(create_issues("P1", "B1", "feature", 3));
    harness.insert_rows(&rows);

    let result = harness.indexer.index_all().unwrap();
    assert_eq!(result, IndexingResult::from_counts(10, 0));

    let docs = harness.index.documents().unwrap();
    assert_eq!(docs.len(), rows.len());
    for row in &rows {
        let doc = harness.index.get_document(&row.key).unwrap().unwrap();
        assert_eq!(doc.project_uuid, row.project_uuid);
        assert_eq!(doc.branch_uuid, row.branch_uuid);
    }

    // Running it again overwrites instead of duplicating.
    harness.indexer.index_all().unwrap();
    assert_eq!(harness.index.count(), 10);
}

#[test]
fn test_index_all_fails_loudly_when_locked() {
    let harness = TestHarness::new();
    harness.insert_rows(&create_issues("P1", "P1", "I", 3));
    harness.index.lock_writes();

    let err = harness.indexer.index_all().unwrap_err();
    assert!(matches!(
        err,
        IndexingError::Unrecoverable {
            failures: 3,
            total: 3
        }
    ));
    assert_eq!(
        err.to_string(),
        "Unrecoverable indexation failures: 3 errors among 3 requests. \
         Check search index logs for further details."
    );
    assert!(harness.queued().is_empty());
}

#[test]
fn test_commit_indexes_rows_and_empties_queue() {
    let harness = TestHarness::new();
    let rows = create_issues("P1", "P1", "I", 2);

    let result = harness.insert_and_index(&rows);
    assert_eq!(result, IndexingResult::from_counts(2, 0));
    assert_eq!(harness.indexed_keys(), vec!["I-0", "I-1"]);
    assert!(harness.queued().is_empty());
}

#[test]
fn test_commit_of_rolled_back_row_deletes_document() {
    let harness = TestHarness::new();
    let row = IssueRow::new("GHOST", "P1", "F1");
    harness
        .index
        .bulk(&[issue_search::BulkRequest::Index(IssueDoc::from_row(&row))])
        .unwrap();
    assert_eq!(harness.index.count(), 1);

    // Staged then dropped: the row never reaches the store.
    {
        let mut tx = harness.storage.begin();
        tx.put_issue(&row).unwrap();
    }
    let result = harness
        .indexer
        .commit_and_index(harness.storage.begin(), &[row])
        .unwrap();

    assert_eq!(result.total(), 1);
    assert_eq!(harness.index.count(), 0);
    assert!(!harness.storage.issue_exists("GHOST").unwrap());
    assert!(harness.queued().is_empty());
}

#[test]
fn test_locked_index_queues_every_row() {
    let harness = TestHarness::new();
    let rows = create_issues("P1", "P1", "I", 2);
    harness.index.lock_writes();

    let result = harness.insert_and_index(&rows);

    assert_eq!(result.total(), 2);
    assert_eq!(result.failures(), 2);
    assert_eq!(harness.index.count(), 0);
    let queued: Vec<String> = harness.queued().into_iter().map(|i| i.doc_id).collect();
    assert_eq!(queued.len(), 2);
    assert!(queued.contains(&"I-0".to_string()));
    assert!(queued.contains(&"I-1".to_string()));
    // The domain write went through regardless.
    assert_eq!(harness.storage.issue_count().unwrap(), 2);
}

#[test]
fn test_recovery_after_unlock_drains_queue() {
    let harness = TestHarness::new();
    let rows = create_issues("P1", "P1", "I", 2);
    harness.index.lock_writes();
    harness.insert_and_index(&rows);

    harness.index.unlock_writes();
    harness.clock.advance(6 * MINUTE_MS);
    let result = harness.recovery(5 * MINUTE_MS).recover_now().unwrap();

    assert_eq!(result, IndexingResult::from_counts(2, 0));
    assert!(harness.queued().is_empty());
    assert_eq!(harness.indexed_keys(), vec!["I-0", "I-1"]);
}

#[test]
fn test_repeated_commits_converge_to_one_document() {
    let harness = TestHarness::new();
    let row = IssueRow::new("I1", "P1", "F1");
    harness.index.lock_writes();

    for n in 0..3 {
        let updated = row.clone().with_message(format!("version {}", n));
        harness.clock.advance(1_000);
        harness.insert_and_index(&[updated]);
    }
    let queued = harness.queued();
    assert_eq!(queued.len(), 3);
    assert!(queued.iter().all(|item| item.doc_id == "I1"));

    harness.index.unlock_writes();
    let result = harness.indexer.index(&queued).unwrap();

    assert_eq!(result.total(), 1);
    assert!(harness.queued().is_empty());
    assert_eq!(harness.index.count(), 1);
    let doc = harness.index.get_document("I1").unwrap().unwrap();
    assert_eq!(doc.message.as_deref(), Some("version 2"));
}

#[test]
fn test_recovery_reads_current_row_state() {
    let harness = TestHarness::new();
    let row = IssueRow::new("I1", "P1", "F1").with_message("first");
    harness.index.lock_writes();
    harness.insert_and_index(&[row.clone()]);

    // Later change applied without indexing.
    harness.insert_rows(&[row.with_message("second")]);

    harness.index.unlock_writes();
    harness.recovery(0).recover_now().unwrap();
    let doc = harness.index.get_document("I1").unwrap().unwrap();
    assert_eq!(doc.message.as_deref(), Some("second"));
}

#[test]
fn test_documents_carry_derived_fields() {
    let harness = TestHarness::new();
    let row = IssueRow::new("I1", "P1", "TEST-FILE")
        .with_qualifier("UTS")
        .with_file_path("src/test/java/FooTest.java")
        .with_type(IssueType::Vulnerability)
        .with_security_standards(["cwe:89", "cwe:564", "owaspTop10:a1", "owaspAsvs-4.0:5.3.4"])
        .with_tags(["sql", "injection"]);
    harness.insert_and_index(&[row]);

    let doc = harness.index.get_document("I1").unwrap().unwrap();
    assert_eq!(doc.scope, IssueScope::Test);
    assert_eq!(doc.cwe, vec!["89", "564"]);
    assert_eq!(doc.owasp_top10, vec!["a1"]);
    assert_eq!(doc.owasp_asvs_40, vec!["5.3.4"]);
    assert_eq!(doc.directory_path.as_deref(), Some("src/test/java"));
    assert_eq!(doc.tags, vec!["sql", "injection"]);

    let main = IssueRow::new("I2", "P1", "F1");
    harness.insert_and_index(&[main]);
    let doc = harness.index.get_document("I2").unwrap().unwrap();
    assert_eq!(doc.scope, IssueScope::Main);
    assert_eq!(doc.cwe, vec!["unknown"]);
}
