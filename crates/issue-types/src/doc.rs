//! Typed search index documents.
//!
//! Each document kind is a concrete struct built from its source rows by
//! an explicit mapping function. The issue index currently holds one kind,
//! [`IssueDoc`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::issue::{IssueRow, IssueType, QUALIFIER_UNIT_TEST_FILE};
use crate::security::{sans_top25, SqCategory, VulnerabilityProbability};

/// Identifies a document type inside a named index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexType {
    pub index: &'static str,
    pub doc_type: &'static str,
}

impl IndexType {
    pub const fn new(index: &'static str, doc_type: &'static str) -> Self {
        Self { index, doc_type }
    }

    /// `index/type`, the value stored in `QueueItem::doc_type`.
    pub fn format(&self) -> String {
        format!("{}/{}", self.index, self.doc_type)
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.doc_type)
    }
}

/// The issue document type.
pub const TYPE_ISSUE: IndexType = IndexType::new("issues", "issue");

/// Whether an issue sits in production code or test code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueScope {
    Main,
    Test,
}

impl IssueScope {
    pub fn for_qualifier(qualifier: &str) -> Self {
        if qualifier == QUALIFIER_UNIT_TEST_FILE {
            IssueScope::Test
        } else {
            IssueScope::Main
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueScope::Main => "MAIN",
            IssueScope::Test => "TEST",
        }
    }
}

const CWE_PREFIX: &str = "cwe:";
const OWASP_TOP10_PREFIX: &str = "owaspTop10:";
const OWASP_ASVS_40_PREFIX: &str = "owaspAsvs-4.0:";
const UNKNOWN_STANDARD: &str = "unknown";

/// Denormalized issue projection stored in the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueDoc {
    pub key: String,
    pub rule_key: String,
    pub project_uuid: String,
    pub branch_uuid: String,
    pub is_main_branch: bool,
    pub component_uuid: String,
    pub scope: IssueScope,
    pub file_path: Option<String>,
    pub directory_path: Option<String>,
    pub language: Option<String>,
    pub line: Option<u32>,
    pub message: Option<String>,
    pub severity: Option<String>,
    pub issue_type: IssueType,
    pub status: String,
    pub resolution: Option<String>,
    pub assignee_uuid: Option<String>,
    pub author_login: Option<String>,
    pub tags: Vec<String>,
    pub cwe: Vec<String>,
    pub owasp_top10: Vec<String>,
    pub owasp_asvs_40: Vec<String>,
    #[serde(default)]
    pub sans_top25: Vec<String>,
    #[serde(default)]
    pub sonarsource_security: SqCategory,
    #[serde(default)]
    pub vulnerability_probability: VulnerabilityProbability,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl IssueDoc {
    /// Build the index document of an issue row.
    pub fn from_row(row: &IssueRow) -> Self {
        let mut cwe = standards_with_prefix(&row.security_standards, CWE_PREFIX);
        if cwe.is_empty() {
            cwe.push(UNKNOWN_STANDARD.to_string());
        }
        let category = SqCategory::from_cwes(&cwe);

        Self {
            key: row.key.clone(),
            rule_key: row.rule_key.clone(),
            project_uuid: row.project_uuid.clone(),
            branch_uuid: row.branch_uuid.clone(),
            is_main_branch: row.is_main_branch,
            component_uuid: row.component_uuid.clone(),
            scope: IssueScope::for_qualifier(&row.component_qualifier),
            file_path: row.file_path.clone(),
            directory_path: row.directory_path.clone(),
            language: row.language.clone(),
            line: row.line,
            message: row.message.clone(),
            severity: row.severity.clone(),
            issue_type: row.issue_type,
            status: row.status.clone(),
            resolution: row.resolution.clone(),
            assignee_uuid: row.assignee_uuid.clone(),
            author_login: row.author_login.clone(),
            tags: row.tags.clone(),
            owasp_top10: standards_with_prefix(&row.security_standards, OWASP_TOP10_PREFIX),
            owasp_asvs_40: standards_with_prefix(&row.security_standards, OWASP_ASVS_40_PREFIX),
            sans_top25: sans_top25(&cwe),
            sonarsource_security: category,
            vulnerability_probability: category.vulnerability(),
            cwe,
            created_at: row.created_at,
            updated_at: row.updated_at,
            closed_at: row.closed_at,
        }
    }

    /// Routing key for document locality.
    pub fn routing(&self) -> &str {
        &self.project_uuid
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn standards_with_prefix(standards: &[String], prefix: &str) -> Vec<String> {
    standards
        .iter()
        .filter_map(|s| s.strip_prefix(prefix))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_type_format() {
        assert_eq!(TYPE_ISSUE.format(), "issues/issue");
        assert_eq!(TYPE_ISSUE.to_string(), "issues/issue");
    }

    #[test]
    fn test_doc_copies_location_fields() {
        let row = IssueRow::new("I1", "P1", "F1")
            .on_branch("B1")
            .with_file_path("src/Foo.java")
            .with_language("java")
            .with_line(444)
            .with_author("marcel")
            .with_assignee("U1");

        let doc = IssueDoc::from_row(&row);

        assert_eq!(doc.key, "I1");
        assert_eq!(doc.project_uuid, "P1");
        assert_eq!(doc.branch_uuid, "B1");
        assert!(!doc.is_main_branch);
        assert_eq!(doc.component_uuid, "F1");
        assert_eq!(doc.file_path.as_deref(), Some("src/Foo.java"));
        assert_eq!(doc.directory_path.as_deref(), Some("src"));
        assert_eq!(doc.language.as_deref(), Some("java"));
        assert_eq!(doc.line, Some(444));
        assert_eq!(doc.author_login.as_deref(), Some("marcel"));
        assert_eq!(doc.assignee_uuid.as_deref(), Some("U1"));
        assert_eq!(doc.routing(), "P1");
    }

    #[test]
    fn test_scope_follows_component_qualifier() {
        let main = IssueDoc::from_row(&IssueRow::new("I1", "P1", "F1"));
        assert_eq!(main.scope, IssueScope::Main);

        let test = IssueDoc::from_row(&IssueRow::new("I2", "P1", "T1").with_qualifier("UTS"));
        assert_eq!(test.scope, IssueScope::Test);
    }

    #[test]
    fn test_security_standards_are_split_by_prefix() {
        let row = IssueRow::new("I1", "P1", "F1").with_security_standards([
            "cwe:123",
            "cwe:863",
            "owaspTop10:a3",
            "owaspAsvs-4.0:2.1.1",
        ]);

        let doc = IssueDoc::from_row(&row);

        assert_eq!(doc.cwe, vec!["123", "863"]);
        assert_eq!(doc.owasp_top10, vec!["a3"]);
        assert_eq!(doc.owasp_asvs_40, vec!["2.1.1"]);
    }

    #[test]
    fn test_missing_cwe_is_unknown() {
        let doc = IssueDoc::from_row(&IssueRow::new("I1", "P1", "F1"));
        assert_eq!(doc.cwe, vec!["unknown"]);
        assert!(doc.owasp_top10.is_empty());
        assert!(doc.sans_top25.is_empty());
        assert_eq!(doc.sonarsource_security, SqCategory::Others);
    }

    #[test]
    fn test_security_classification_from_cwe() {
        let row = IssueRow::new("I1", "P1", "F1").with_security_standards(["cwe:123", "cwe:863"]);
        let doc = IssueDoc::from_row(&row);
        assert_eq!(doc.sans_top25, vec!["porous-defenses"]);
        assert_eq!(doc.sonarsource_security, SqCategory::Others);
        assert_eq!(doc.vulnerability_probability, VulnerabilityProbability::Low);

        let row = IssueRow::new("I2", "P1", "F1").with_security_standards(["cwe:89"]);
        let doc = IssueDoc::from_row(&row);
        assert_eq!(doc.sans_top25, vec!["insecure-interaction"]);
        assert_eq!(doc.sonarsource_security, SqCategory::SqlInjection);
        assert_eq!(doc.vulnerability_probability, VulnerabilityProbability::High);
    }

    #[test]
    fn test_security_fields_survive_json() {
        let row = IssueRow::new("I1", "P1", "F1").with_security_standards(["cwe:79"]);
        let doc = IssueDoc::from_row(&row);

        let json = doc.to_json().unwrap();
        assert!(json.contains("\"sonarsource_security\":\"xss\""));
        assert!(json.contains("\"vulnerability_probability\":\"HIGH\""));
        assert_eq!(IssueDoc::from_json(&json).unwrap(), doc);
    }
}
