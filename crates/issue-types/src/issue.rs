//! Issue rows as stored in the primary store.
//!
//! An issue belongs to exactly one component of one branch. The branch
//! UUID is the grouping key used for bulk operations; for the main branch
//! it is equal to the project UUID.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Component qualifier of unit test files.
pub const QUALIFIER_UNIT_TEST_FILE: &str = "UTS";

/// Component qualifier of regular source files.
pub const QUALIFIER_FILE: &str = "FIL";

/// Kind of issue raised by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    #[default]
    CodeSmell,
    Bug,
    Vulnerability,
    SecurityHotspot,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::CodeSmell => "CODE_SMELL",
            IssueType::Bug => "BUG",
            IssueType::Vulnerability => "VULNERABILITY",
            IssueType::SecurityHotspot => "SECURITY_HOTSPOT",
        }
    }
}

/// An authoritative issue record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRow {
    /// Stable issue key, also the index document id
    pub key: String,

    pub rule_key: String,

    pub project_uuid: String,

    /// Grouping key for branch-wide operations
    pub branch_uuid: String,

    pub is_main_branch: bool,

    pub component_uuid: String,

    /// Qualifier of the component (`FIL`, `UTS`, `DIR`, `TRK`)
    pub component_qualifier: String,

    #[serde(default)]
    pub file_path: Option<String>,

    #[serde(default)]
    pub directory_path: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub line: Option<u32>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub severity: Option<String>,

    #[serde(default)]
    pub issue_type: IssueType,

    pub status: String,

    #[serde(default)]
    pub resolution: Option<String>,

    #[serde(default)]
    pub assignee_uuid: Option<String>,

    #[serde(default)]
    pub author_login: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Security standards of the rule, e.g. `cwe:89` or `owaspTop10:a1`
    #[serde(default)]
    pub security_standards: Vec<String>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl IssueRow {
    /// Create an open code smell on a file of the main branch of `project_uuid`,
    /// dated at the Unix epoch until `with_dates` says otherwise.
    pub fn new(
        key: impl Into<String>,
        project_uuid: impl Into<String>,
        component_uuid: impl Into<String>,
    ) -> Self {
        let project_uuid = project_uuid.into();
        Self {
            key: key.into(),
            rule_key: "xoo:x1".to_string(),
            branch_uuid: project_uuid.clone(),
            project_uuid,
            is_main_branch: true,
            component_uuid: component_uuid.into(),
            component_qualifier: QUALIFIER_FILE.to_string(),
            file_path: None,
            directory_path: None,
            language: None,
            line: None,
            message: None,
            severity: None,
            issue_type: IssueType::default(),
            status: "OPEN".to_string(),
            resolution: None,
            assignee_uuid: None,
            author_login: None,
            tags: Vec::new(),
            security_standards: Vec::new(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            closed_at: None,
        }
    }

    /// Move the issue to a non-main branch.
    pub fn on_branch(mut self, branch_uuid: impl Into<String>) -> Self {
        self.branch_uuid = branch_uuid.into();
        self.is_main_branch = self.branch_uuid == self.project_uuid;
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.component_qualifier = qualifier.into();
        self
    }

    /// Set the file path; the directory path is derived from it.
    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.directory_path = Some(match path.rfind('/') {
            Some(idx) => path[..idx].to_string(),
            None => "/".to_string(),
        });
        self.file_path = Some(path);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_type(mut self, issue_type: IssueType) -> Self {
        self.issue_type = issue_type;
        self
    }

    pub fn with_assignee(mut self, assignee_uuid: impl Into<String>) -> Self {
        self.assignee_uuid = Some(assignee_uuid.into());
        self
    }

    pub fn with_author(mut self, login: impl Into<String>) -> Self {
        self.author_login = Some(login.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_security_standards<I, S>(mut self, standards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.security_standards = standards.into_iter().map(Into::into).collect();
        self
    }

    /// Close the issue with the given resolution.
    pub fn with_dates(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    pub fn closed(mut self, resolution: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.status = "CLOSED".to_string();
        self.resolution = Some(resolution.into());
        self.closed_at = Some(at);
        self.updated_at = at;
        self
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_issue_defaults_to_main_branch() {
        let row = IssueRow::new("I1", "P1", "F1");
        assert_eq!(row.branch_uuid, "P1");
        assert!(row.is_main_branch);
        assert_eq!(row.component_qualifier, QUALIFIER_FILE);
        assert_eq!(row.status, "OPEN");
    }

    #[test]
    fn test_new_issue_is_deterministic() {
        let first = IssueRow::new("I1", "P1", "F1");
        let second = IssueRow::new("I1", "P1", "F1");
        assert_eq!(first, second);
        assert_eq!(first.created_at.timestamp_millis(), 0);
        assert_eq!(first.updated_at, first.created_at);
    }

    #[test]
    fn test_with_dates_sets_both_timestamps() {
        let created = DateTime::from_timestamp_millis(1_600_000_000_000).unwrap();
        let updated = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let row = IssueRow::new("I1", "P1", "F1").with_dates(created, updated);
        assert_eq!(row.created_at, created);
        assert_eq!(row.updated_at, updated);
    }

    #[test]
    fn test_on_branch_clears_main_flag() {
        let row = IssueRow::new("I1", "P1", "F1").on_branch("B1");
        assert_eq!(row.branch_uuid, "B1");
        assert!(!row.is_main_branch);
    }

    #[test]
    fn test_file_path_derives_directory() {
        let row = IssueRow::new("I1", "P1", "F1").with_file_path("src/main/java/Foo.java");
        assert_eq!(row.directory_path.as_deref(), Some("src/main/java"));

        let row = IssueRow::new("I2", "P1", "F1").with_file_path("Foo.java");
        assert_eq!(row.directory_path.as_deref(), Some("/"));
    }

    #[test]
    fn test_closed_issue_survives_storage_encoding() {
        let closed_at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let row = IssueRow::new("I1", "P1", "F1")
            .with_tags(["security", "cert"])
            .closed("FIXED", closed_at);

        let decoded = IssueRow::from_bytes(&row.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.closed_at, Some(closed_at));
        assert_eq!(decoded.resolution.as_deref(), Some("FIXED"));
        assert_eq!(decoded.tags, vec!["security", "cert"]);
    }

    #[test]
    fn test_issue_type_wire_names() {
        let json = serde_json::to_string(&IssueType::SecurityHotspot).unwrap();
        assert_eq!(json, "\"SECURITY_HOTSPOT\"");
        assert_eq!(IssueType::Bug.as_str(), "BUG");
    }
}
