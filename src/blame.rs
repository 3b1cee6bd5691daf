//! Per-author blame aggregation over the files of a change request.
//!
//! The walk is written once against [`ProviderClient`] and reused for every
//! provider: for each changed file, read its full commit history, resolve
//! each commit's author, weigh the commit by the lines it changed in that
//! file, and add the weight to the author's running total.

use std::collections::{BTreeMap, HashMap};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::data::{AuthorContribution, ChangeRequest, FileChange};
use crate::provider::{find_open_change_request, ProviderClient, Result};

/// Tuning knobs for a blame walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlameOptions {
    /// Upper bound on history entries read per file. `None` walks the whole
    /// history.
    pub max_commits_per_file: Option<usize>,
}

/// Author contributions collected by one aggregation call.
///
/// Authors keep the position in which they were first encountered, which is
/// what breaks ties when ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlameReport {
    contributions: Vec<AuthorContribution>,
    index: HashMap<String, usize>,
}

impl BlameReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `lines` to `author`, registering the author on first sight.
    pub fn record(&mut self, author: &str, lines: u64) {
        match self.index.get(author) {
            Some(&position) => self.contributions[position].lines += lines,
            None => {
                self.index.insert(author.to_string(), self.contributions.len());
                self.contributions.push(AuthorContribution {
                    author: author.to_string(),
                    lines,
                });
            }
        }
    }

    /// Returns the lines attributed to `author`.
    pub fn lines_for(&self, author: &str) -> Option<u64> {
        self.index
            .get(author)
            .map(|&position| self.contributions[position].lines)
    }

    /// Contributions in first-encounter order.
    pub fn contributions(&self) -> &[AuthorContribution] {
        &self.contributions
    }

    /// Contributions sorted by line count, highest first. Ties keep
    /// first-encounter order.
    pub fn ranked(&self) -> Vec<&AuthorContribution> {
        let mut ranked: Vec<&AuthorContribution> = self.contributions.iter().collect();
        ranked.sort_by(|a, b| b.lines.cmp(&a.lines));
        ranked
    }

    /// Totals keyed by author, without ordering information.
    pub fn totals(&self) -> BTreeMap<String, u64> {
        self.contributions
            .iter()
            .map(|contribution| (contribution.author.clone(), contribution.lines))
            .collect()
    }

    /// Number of distinct authors.
    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    /// Returns true when no author was recorded.
    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }
}

impl Serialize for BlameReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.contributions.len()))?;
        for contribution in &self.contributions {
            map.serialize_entry(&contribution.author, &contribution.lines)?;
        }
        map.end()
    }
}

/// Lines changed in `path` according to a commit's file list; 0 when the
/// commit detail does not mention the path.
pub fn changed_lines_for_path(changes: &[FileChange], path: &str) -> u64 {
    changes
        .iter()
        .filter(|change| change.path == path)
        .map(FileChange::changed_lines)
        .sum()
}

/// Aggregates per-author changed lines over the history of `changed_files`.
///
/// Fails on the first provider error; no partial report is returned. Commit
/// details are fetched at most once per commit within a call.
pub async fn aggregate_blame(
    client: &dyn ProviderClient,
    full_name: &str,
    change_request_number: u64,
    changed_files: &[String],
    options: &BlameOptions,
) -> Result<BlameReport> {
    info!(
        provider = %client.kind(),
        repository = full_name,
        change_request = change_request_number,
        files = changed_files.len(),
        "Aggregating blame"
    );

    let mut report = BlameReport::new();
    let mut commit_changes: HashMap<String, Vec<FileChange>> = HashMap::new();

    for path in changed_files {
        let history = client
            .file_history(full_name, path, options.max_commits_per_file)
            .await?;
        debug!(path = %path, commits = history.len(), "Fetched file history");

        for commit in &history {
            if !commit_changes.contains_key(&commit.sha) {
                let changes = client.commit_changes(full_name, &commit.sha).await?;
                commit_changes.insert(commit.sha.clone(), changes);
            }
            let weight = commit_changes
                .get(&commit.sha)
                .map_or(0, |changes| changed_lines_for_path(changes, path));
            report.record(&commit.author_identity(), weight);
        }
    }

    info!(
        authors = report.len(),
        commits = commit_changes.len(),
        "Blame aggregation complete"
    );
    Ok(report)
}

/// Looks up an open change request and aggregates blame over its files.
///
/// A number that is not among the open change requests fails with
/// [`ProviderError::ChangeRequestNotFound`](crate::provider::ProviderError::ChangeRequestNotFound)
/// before any history is read.
pub async fn analyze_change_request(
    client: &dyn ProviderClient,
    full_name: &str,
    number: u64,
    options: &BlameOptions,
) -> Result<(ChangeRequest, BlameReport)> {
    let change_request = find_open_change_request(client, full_name, number).await?;
    let report = aggregate_blame(
        client,
        full_name,
        change_request.number,
        &change_request.changed_files,
        options,
    )
    .await?;
    Ok((change_request, report))
}
