//! Why a project or branch needs reindexing.

use std::fmt;
use std::str::FromStr;

/// Event that triggered a group reindex.
///
/// Issue documents do not carry project keys, tags, measures or
/// permissions, so only deletion requires issue documents to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectIndexerCause {
    ProjectCreation,
    ProjectDeletion,
    ProjectKeyUpdate,
    ProjectTagsUpdate,
    PermissionChange,
    MeasureChange,
}

impl ProjectIndexerCause {
    pub const ALL: [ProjectIndexerCause; 6] = [
        ProjectIndexerCause::ProjectCreation,
        ProjectIndexerCause::ProjectDeletion,
        ProjectIndexerCause::ProjectKeyUpdate,
        ProjectIndexerCause::ProjectTagsUpdate,
        ProjectIndexerCause::PermissionChange,
        ProjectIndexerCause::MeasureChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectIndexerCause::ProjectCreation => "project-creation",
            ProjectIndexerCause::ProjectDeletion => "project-deletion",
            ProjectIndexerCause::ProjectKeyUpdate => "project-key-update",
            ProjectIndexerCause::ProjectTagsUpdate => "project-tags-update",
            ProjectIndexerCause::PermissionChange => "permission-change",
            ProjectIndexerCause::MeasureChange => "measure-change",
        }
    }

    /// Whether issue documents of the group must be rewritten.
    pub fn affects_issues(&self) -> bool {
        matches!(self, ProjectIndexerCause::ProjectDeletion)
    }
}

impl fmt::Display for ProjectIndexerCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectIndexerCause {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cause| cause.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
                format!("unknown cause '{}', expected one of: {}", s, names.join(", "))
            })
    }
}
