//! Data structures shared by the provider adapters, the aggregator and the formatters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::ProviderKind;

/// Placeholder identity used when a commit carries no usable author fields.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// A repository visible to the authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Short repository name.
    pub name: String,
    /// Fully qualified `owner/name` (GitLab: `group/.../name`).
    pub full_name: String,
    /// Web URL of the repository.
    pub url: String,
    /// Provider that hosts the repository.
    pub provider: ProviderKind,
}

/// An open pull request (GitHub) or merge request (GitLab).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Provider-scoped number (GitHub PR number, GitLab MR iid).
    pub number: u64,
    /// Title.
    pub title: String,
    /// Normalized state, always `open` for listings.
    pub state: String,
    /// Web URL.
    pub url: String,
    /// Provider that hosts the change request.
    pub provider: ProviderKind,
    /// Paths touched by the change request, in provider order.
    pub changed_files: Vec<String>,
}

/// A single entry of a commit history listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full commit SHA.
    pub sha: String,
    /// Provider account handle of the author, when the provider links one.
    pub author_login: Option<String>,
    /// Author display name from the commit.
    pub author_name: Option<String>,
    /// Author email from the commit.
    pub author_email: Option<String>,
    /// Author timestamp.
    pub authored_at: Option<DateTime<Utc>>,
}

impl CommitRecord {
    /// Resolves the identity this commit is attributed to.
    pub fn author_identity(&self) -> String {
        resolve_author_identity(
            self.author_login.as_deref(),
            self.author_name.as_deref(),
            self.author_email.as_deref(),
        )
    }
}

/// Per-file line counts of one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path of the file after the commit.
    pub path: String,
    /// Lines added.
    pub additions: u64,
    /// Lines removed.
    pub deletions: u64,
}

impl FileChange {
    /// Total changed lines, the weight a commit contributes for this file.
    pub fn changed_lines(&self) -> u64 {
        self.additions + self.deletions
    }
}

/// Accumulated contribution of one author within a single aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorContribution {
    /// Resolved author identity.
    pub author: String,
    /// Changed lines attributed to the author.
    pub lines: u64,
}

/// Resolves an author identity: login, then display name, then email, then
/// [`UNKNOWN_AUTHOR`]. Blank values are skipped.
pub fn resolve_author_identity(
    login: Option<&str>,
    name: Option<&str>,
    email: Option<&str>,
) -> String {
    [login, name, email]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_AUTHOR)
        .to_string()
}
