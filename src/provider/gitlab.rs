//! GitLab REST API (v4) client.

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::{
    build_http_client, collect_pages, endpoint, fetch_json, parse_api_url, sort_repositories,
    validate_project_path, ProviderClient, ProviderFuture, ProviderKind, Result, MAX_PAGE_SIZE,
};
use crate::data::{ChangeRequest, CommitRecord, FileChange, Repository};

/// Public GitLab API endpoint.
pub const DEFAULT_API_URL: &str = "https://gitlab.com/api/v4";

/// `GET /user` response.
#[derive(Deserialize, Debug)]
struct User {
    username: String,
}

/// Entry of `GET /projects`.
#[derive(Deserialize, Debug)]
struct Project {
    name: String,
    path_with_namespace: String,
    web_url: String,
}

/// Entry of `GET /projects/:id/merge_requests`.
#[derive(Deserialize, Debug)]
struct MergeRequest {
    iid: u64,
    title: String,
    state: String,
    web_url: String,
}

/// `GET /projects/:id/merge_requests/:iid/changes` response.
#[derive(Deserialize, Debug)]
struct MergeRequestChanges {
    #[serde(default)]
    changes: Vec<MergeRequestChange>,
}

/// File entry of a merge request's changes.
#[derive(Deserialize, Debug)]
struct MergeRequestChange {
    new_path: String,
}

/// Entry of `GET /projects/:id/repository/commits`.
#[derive(Deserialize, Debug)]
struct Commit {
    id: String,
    author_name: Option<String>,
    author_email: Option<String>,
    authored_date: Option<DateTime<Utc>>,
}

impl From<Commit> for CommitRecord {
    fn from(commit: Commit) -> Self {
        Self {
            sha: commit.id,
            // GitLab commits are not linked to an account handle.
            author_login: None,
            author_name: commit.author_name,
            author_email: commit.author_email,
            authored_at: commit.authored_date,
        }
    }
}

/// Entry of `GET /projects/:id/repository/commits/:sha/diff`.
#[derive(Deserialize, Debug)]
struct CommitDiff {
    new_path: String,
    #[serde(default)]
    diff: String,
}

impl From<CommitDiff> for FileChange {
    fn from(entry: CommitDiff) -> Self {
        let (additions, deletions) = count_diff_lines(&entry.diff);
        Self {
            path: entry.new_path,
            additions,
            deletions,
        }
    }
}

/// Counts added and removed lines in the hunks of a unified diff.
///
/// Anything before the first `@@` header is file metadata and is skipped.
pub(crate) fn count_diff_lines(diff: &str) -> (u64, u64) {
    let mut additions = 0;
    let mut deletions = 0;
    let mut in_hunk = false;
    for line in diff.lines() {
        if line.starts_with("@@") {
            in_hunk = true;
        } else if !in_hunk {
            continue;
        } else if line.starts_with('+') {
            additions += 1;
        } else if line.starts_with('-') {
            deletions += 1;
        }
    }
    (additions, deletions)
}

/// Converts GitLab's `opened` state to the provider-neutral `open`.
fn normalize_state(state: String) -> String {
    if state == "opened" {
        "open".to_string()
    } else {
        state
    }
}

/// GitLab API client.
pub struct GitLabClient {
    /// HTTP client for API requests.
    client: Client,
    /// Personal access token.
    token: String,
    /// API base URL (e.g., "https://gitlab.com/api/v4").
    base_url: Url,
}

impl GitLabClient {
    /// Creates a client for the given API base URL.
    pub fn new(token: String, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            token,
            base_url: parse_api_url(base_url)?,
        })
    }

    /// Creates a client for gitlab.com.
    pub fn new_public(token: String) -> Result<Self> {
        Self::new(token, DEFAULT_API_URL)
    }

    /// Builds an authenticated GET request.
    fn get(&self, url: Url) -> RequestBuilder {
        debug!(url = %url, "GitLab API request");
        self.client
            .get(url)
            .header("PRIVATE-TOKEN", self.token.as_str())
    }

    /// Builds a `/projects/:id/...` URL with `per_page` set.
    ///
    /// The project path goes into a single, percent-encoded segment.
    fn project_url(&self, full_name: &str, tail: &[&str]) -> Result<Url> {
        let project = validate_project_path(full_name)?;
        let mut segments = vec!["projects", project];
        segments.extend_from_slice(tail);
        let mut url = endpoint(&self.base_url, &segments)?;
        url.query_pairs_mut()
            .append_pair("per_page", &MAX_PAGE_SIZE.to_string());
        Ok(url)
    }

    /// Fetches one page of a commit listing filtered by `filter`.
    async fn commits_page(
        &self,
        full_name: &str,
        filter: (&str, &str),
        page: u32,
    ) -> Result<Vec<CommitRecord>> {
        let mut url = self.project_url(full_name, &["repository", "commits"])?;
        url.query_pairs_mut()
            .append_pair(filter.0, filter.1)
            .append_pair("page", &page.to_string());
        let commits: Vec<Commit> = fetch_json(ProviderKind::GitLab, self.get(url)).await?;
        Ok(commits.into_iter().map(CommitRecord::from).collect())
    }

    /// Fetches one page of a commit's per-file diff.
    async fn diff_page(&self, full_name: &str, sha: &str, page: u32) -> Result<Vec<FileChange>> {
        let mut url = self.project_url(full_name, &["repository", "commits", sha, "diff"])?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        let diffs: Vec<CommitDiff> = fetch_json(ProviderKind::GitLab, self.get(url)).await?;
        Ok(diffs.into_iter().map(FileChange::from).collect())
    }

    /// Lists the file paths touched by one merge request.
    async fn merge_request_files(&self, full_name: &str, iid: u64) -> Result<Vec<String>> {
        let iid = iid.to_string();
        let url = self.project_url(full_name, &["merge_requests", &iid, "changes"])?;
        let changes: MergeRequestChanges = fetch_json(ProviderKind::GitLab, self.get(url)).await?;
        Ok(changes
            .changes
            .into_iter()
            .map(|change| change.new_path)
            .collect())
    }
}

impl ProviderClient for GitLabClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitLab
    }

    fn current_user(&self) -> ProviderFuture<'_, String> {
        Box::pin(async move {
            let url = endpoint(&self.base_url, &["user"])?;
            let user: User = fetch_json(ProviderKind::GitLab, self.get(url)).await?;
            Ok(user.username)
        })
    }

    fn list_repositories(&self) -> ProviderFuture<'_, Vec<Repository>> {
        Box::pin(async move {
            let mut url = endpoint(&self.base_url, &["projects"])?;
            url.query_pairs_mut()
                .append_pair("membership", "true")
                .append_pair("per_page", &MAX_PAGE_SIZE.to_string())
                .append_pair("order_by", "updated_at")
                .append_pair("sort", "desc");

            let projects: Vec<Project> = fetch_json(ProviderKind::GitLab, self.get(url)).await?;
            let mut repositories: Vec<Repository> = projects
                .into_iter()
                .map(|project| Repository {
                    name: project.name,
                    full_name: project.path_with_namespace,
                    url: project.web_url,
                    provider: ProviderKind::GitLab,
                })
                .collect();
            sort_repositories(&mut repositories);

            info!(count = repositories.len(), "Listed GitLab projects");
            Ok(repositories)
        })
    }

    fn list_open_change_requests<'a>(
        &'a self,
        full_name: &'a str,
    ) -> ProviderFuture<'a, Vec<ChangeRequest>> {
        Box::pin(async move {
            let mut url = self.project_url(full_name, &["merge_requests"])?;
            url.query_pairs_mut().append_pair("state", "opened");
            let merge_requests: Vec<MergeRequest> =
                fetch_json(ProviderKind::GitLab, self.get(url)).await?;

            let mut change_requests = Vec::with_capacity(merge_requests.len());
            for merge_request in merge_requests {
                let changed_files = self
                    .merge_request_files(full_name, merge_request.iid)
                    .await?;
                debug!(
                    iid = merge_request.iid,
                    files = changed_files.len(),
                    "Fetched merge request changes"
                );
                change_requests.push(ChangeRequest {
                    number: merge_request.iid,
                    title: merge_request.title,
                    state: normalize_state(merge_request.state),
                    url: merge_request.web_url,
                    provider: ProviderKind::GitLab,
                    changed_files,
                });
            }

            info!(
                repository = full_name,
                count = change_requests.len(),
                "Listed open merge requests"
            );
            Ok(change_requests)
        })
    }

    fn file_history<'a>(
        &'a self,
        full_name: &'a str,
        path: &'a str,
        limit: Option<usize>,
    ) -> ProviderFuture<'a, Vec<CommitRecord>> {
        Box::pin(async move {
            collect_pages(limit, |page| self.commits_page(full_name, ("path", path), page)).await
        })
    }

    fn commit_changes<'a>(
        &'a self,
        full_name: &'a str,
        sha: &'a str,
    ) -> ProviderFuture<'a, Vec<FileChange>> {
        Box::pin(async move {
            collect_pages(None, |page| self.diff_page(full_name, sha, page)).await
        })
    }

    fn commits_since<'a>(
        &'a self,
        full_name: &'a str,
        since: DateTime<Utc>,
    ) -> ProviderFuture<'a, Vec<CommitRecord>> {
        Box::pin(async move {
            let since = since.to_rfc3339();
            collect_pages(None, |page| {
                self.commits_page(full_name, ("since", since.as_str()), page)
            })
            .await
        })
    }
}
