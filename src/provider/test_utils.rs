//! Shared test utilities for the `provider` module.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::{ProviderClient, ProviderError, ProviderFuture, ProviderKind};
use crate::data::{ChangeRequest, CommitRecord, FileChange, Repository};

/// In-memory provider with canned repositories, histories and commit details.
///
/// Every call is recorded as a short string (`"history a.go"`,
/// `"changes c1"`, ...) so tests can assert which remote operations would
/// have been issued. Use [`call_handle`](Self::call_handle) to read the log
/// after the client has been borrowed by the code under test.
pub(crate) struct MockProviderClient {
    kind: ProviderKind,
    repositories: Vec<Repository>,
    change_requests: Vec<ChangeRequest>,
    histories: HashMap<String, Vec<CommitRecord>>,
    changes: HashMap<String, Vec<FileChange>>,
    failing_paths: HashSet<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockProviderClient {
    /// Creates an empty mock for `kind`.
    pub(crate) fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            repositories: Vec::new(),
            change_requests: Vec::new(),
            histories: HashMap::new(),
            changes: HashMap::new(),
            failing_paths: HashSet::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a repository to the listing.
    pub(crate) fn with_repository(mut self, full_name: &str) -> Self {
        self.repositories.push(Repository {
            name: full_name.rsplit('/').next().unwrap_or(full_name).to_string(),
            full_name: full_name.to_string(),
            url: format!("https://example.com/{full_name}"),
            provider: self.kind,
        });
        self
    }

    /// Adds an open change request touching `files`.
    pub(crate) fn with_change_request(mut self, number: u64, files: &[&str]) -> Self {
        self.change_requests.push(ChangeRequest {
            number,
            title: format!("Change {number}"),
            state: "open".to_string(),
            url: format!("https://example.com/change/{number}"),
            provider: self.kind,
            changed_files: files.iter().map(ToString::to_string).collect(),
        });
        self
    }

    /// Adds a commit by `author` to the history of `path`, weighing `lines`
    /// for that path.
    pub(crate) fn with_commit(mut self, path: &str, sha: &str, author: &str, lines: u64) -> Self {
        self.histories
            .entry(path.to_string())
            .or_default()
            .push(commit(sha, Some(author), None));
        self.changes
            .entry(sha.to_string())
            .or_default()
            .push(FileChange {
                path: path.to_string(),
                additions: lines,
                deletions: 0,
            });
        self
    }

    /// Adds an arbitrary commit record to the history of `path`.
    pub(crate) fn with_history_entry(mut self, path: &str, record: CommitRecord) -> Self {
        self.histories
            .entry(path.to_string())
            .or_default()
            .push(record);
        self
    }

    /// Makes history lookups for `path` fail.
    pub(crate) fn failing_on(mut self, path: &str) -> Self {
        self.failing_paths.insert(path.to_string());
        self
    }

    /// Returns a handle for reading the call log.
    pub(crate) fn call_handle(&self) -> CallLogHandle {
        CallLogHandle {
            calls: self.calls.clone(),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Builds a commit record with the given author fields.
pub(crate) fn commit(sha: &str, login: Option<&str>, name: Option<&str>) -> CommitRecord {
    CommitRecord {
        sha: sha.to_string(),
        author_login: login.map(ToString::to_string),
        author_name: name.map(ToString::to_string),
        author_email: None,
        authored_at: None,
    }
}

/// Shared handle to a mock client's call log.
pub(crate) struct CallLogHandle {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLogHandle {
    /// Returns all recorded calls in order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns the number of recorded calls starting with `prefix`.
    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }
}

impl ProviderClient for MockProviderClient {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn current_user(&self) -> ProviderFuture<'_, String> {
        self.record("user".to_string());
        Box::pin(async move { Ok("mock-user".to_string()) })
    }

    fn list_repositories(&self) -> ProviderFuture<'_, Vec<Repository>> {
        self.record("repositories".to_string());
        let mut repositories = self.repositories.clone();
        super::sort_repositories(&mut repositories);
        Box::pin(async move { Ok(repositories) })
    }

    fn list_open_change_requests<'a>(
        &'a self,
        full_name: &'a str,
    ) -> ProviderFuture<'a, Vec<ChangeRequest>> {
        self.record(format!("change_requests {full_name}"));
        let change_requests = self.change_requests.clone();
        Box::pin(async move { Ok(change_requests) })
    }

    fn file_history<'a>(
        &'a self,
        _full_name: &'a str,
        path: &'a str,
        limit: Option<usize>,
    ) -> ProviderFuture<'a, Vec<CommitRecord>> {
        self.record(format!("history {path}"));
        Box::pin(async move {
            if self.failing_paths.contains(path) {
                return Err(ProviderError::NetworkError(format!("history for {path}")));
            }
            let mut history = self.histories.get(path).cloned().unwrap_or_default();
            if let Some(limit) = limit {
                history.truncate(limit);
            }
            Ok(history)
        })
    }

    fn commit_changes<'a>(
        &'a self,
        _full_name: &'a str,
        sha: &'a str,
    ) -> ProviderFuture<'a, Vec<FileChange>> {
        self.record(format!("changes {sha}"));
        let changes = self.changes.get(sha).cloned().unwrap_or_default();
        Box::pin(async move { Ok(changes) })
    }

    fn commits_since<'a>(
        &'a self,
        _full_name: &'a str,
        since: DateTime<Utc>,
    ) -> ProviderFuture<'a, Vec<CommitRecord>> {
        self.record(format!("commits_since {}", since.format("%Y-%m-%d")));
        let mut seen = HashSet::new();
        let mut commits: Vec<CommitRecord> = self
            .histories
            .values()
            .flatten()
            .filter(|record| seen.insert(record.sha.clone()))
            .cloned()
            .collect();
        commits.sort_by(|a, b| a.sha.cmp(&b.sha));
        Box::pin(async move { Ok(commits) })
    }
}
