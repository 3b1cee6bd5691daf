//! Commit history export in the code-maat `git2` log format.
//!
//! Each commit renders as
//!
//! ```text
//! --{sha7}--{YYYY-MM-DD}--{author}
//! {additions}\t{deletions}\t{path}
//! ...
//!
//! ```

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::info;

use crate::data::{CommitRecord, FileChange};
use crate::provider::{ProviderClient, Result};

/// Start date used when none is given.
pub const DEFAULT_SINCE: &str = "2024-01-01";

/// Exported history of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryLog {
    /// Number of commits rendered.
    pub commits: usize,
    /// Rendered log text.
    pub text: String,
}

/// Parses a `YYYY-MM-DD` start date.
pub fn parse_since(raw: &str) -> anyhow::Result<NaiveDate> {
    use anyhow::Context;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{raw}', expected YYYY-MM-DD"))
}

/// Start of `date` in UTC.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

/// Renders one commit entry, including its trailing blank line.
pub fn render_log_entry(commit: &CommitRecord, changes: &[FileChange]) -> String {
    let short_sha: String = commit.sha.chars().take(7).collect();
    let date = commit
        .authored_at
        .unwrap_or(DateTime::UNIX_EPOCH)
        .format("%Y-%m-%d");
    let mut out = format!("--{short_sha}--{date}--{}\n", commit.author_identity());
    for change in changes {
        let _ = writeln!(
            out,
            "{}\t{}\t{}",
            change.additions, change.deletions, change.path
        );
    }
    out.push('\n');
    out
}

/// Exports every commit authored on or after `since`.
pub async fn export_history_log(
    client: &dyn ProviderClient,
    full_name: &str,
    since: NaiveDate,
) -> Result<HistoryLog> {
    let commits = client.commits_since(full_name, start_of_day(since)).await?;
    info!(
        provider = %client.kind(),
        repository = full_name,
        since = %since,
        commits = commits.len(),
        "Exporting history log"
    );

    let mut text = String::new();
    for commit in &commits {
        let changes = client.commit_changes(full_name, &commit.sha).await?;
        text.push_str(&render_log_entry(commit, &changes));
    }

    Ok(HistoryLog {
        commits: commits.len(),
        text,
    })
}
