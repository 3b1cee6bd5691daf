//! GitHub REST API client.

use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::{
    build_http_client, collect_pages, endpoint, fetch_json, parse_api_url, sort_repositories,
    split_full_name, ProviderClient, ProviderFuture, ProviderKind, Result, MAX_PAGE_SIZE,
};
use crate::data::{ChangeRequest, CommitRecord, FileChange, Repository};

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// REST API version pinned in every request.
const API_VERSION: &str = "2022-11-28";

/// `GET /user` response.
#[derive(Deserialize, Debug)]
struct User {
    login: String,
}

/// Entry of `GET /user/repos`.
#[derive(Deserialize, Debug)]
struct RepositoryEntry {
    name: String,
    full_name: String,
    html_url: String,
}

/// Entry of `GET /repos/{owner}/{repo}/pulls`.
#[derive(Deserialize, Debug)]
struct PullRequestEntry {
    number: u64,
    title: String,
    state: String,
    html_url: String,
}

/// Entry of `GET /repos/{owner}/{repo}/pulls/{number}/files`.
#[derive(Deserialize, Debug)]
struct PullRequestFile {
    filename: String,
}

/// Git-level author or committer.
#[derive(Deserialize, Debug)]
struct GitActor {
    name: Option<String>,
    email: Option<String>,
    date: Option<DateTime<Utc>>,
}

/// Git-level commit data nested in a commit listing.
#[derive(Deserialize, Debug)]
struct GitCommit {
    author: Option<GitActor>,
}

/// GitHub account linked to a commit, absent for unknown emails.
#[derive(Deserialize, Debug)]
struct Account {
    login: Option<String>,
}

/// Entry of `GET /repos/{owner}/{repo}/commits`.
#[derive(Deserialize, Debug)]
struct CommitEntry {
    sha: String,
    commit: GitCommit,
    author: Option<Account>,
}

impl From<CommitEntry> for CommitRecord {
    fn from(entry: CommitEntry) -> Self {
        let (author_name, author_email, authored_at) = match entry.commit.author {
            Some(actor) => (actor.name, actor.email, actor.date),
            None => (None, None, None),
        };
        Self {
            sha: entry.sha,
            author_login: entry.author.and_then(|account| account.login),
            author_name,
            author_email,
            authored_at,
        }
    }
}

/// `GET /repos/{owner}/{repo}/commits/{sha}` response.
#[derive(Deserialize, Debug)]
struct CommitDetail {
    #[serde(default)]
    files: Vec<CommitFile>,
}

/// File entry of a commit detail.
#[derive(Deserialize, Debug)]
struct CommitFile {
    filename: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

/// GitHub API client.
pub struct GitHubClient {
    /// HTTP client for API requests.
    client: Client,
    /// Personal access token.
    token: String,
    /// API base URL (e.g., "https://api.github.com").
    base_url: Url,
}

impl GitHubClient {
    /// Creates a client for the given API base URL.
    pub fn new(token: String, base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            token,
            base_url: parse_api_url(base_url)?,
        })
    }

    /// Creates a client for github.com.
    pub fn new_public(token: String) -> Result<Self> {
        Self::new(token, DEFAULT_API_URL)
    }

    /// Builds an authenticated GET request.
    fn get(&self, url: Url) -> RequestBuilder {
        debug!(url = %url, "GitHub API request");
        self.client
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Builds a `/repos/{owner}/{repo}/...` URL with `per_page` set.
    fn repo_url(&self, full_name: &str, tail: &[&str]) -> Result<Url> {
        let (owner, repo) = split_full_name(full_name)?;
        let mut segments = vec!["repos", owner, repo];
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
        let mut url = self.repo_url(full_name, &["commits"])?;
        url.query_pairs_mut()
            .append_pair(filter.0, filter.1)
            .append_pair("page", &page.to_string());
        let entries: Vec<CommitEntry> = fetch_json(ProviderKind::GitHub, self.get(url)).await?;
        Ok(entries.into_iter().map(CommitRecord::from).collect())
    }

    /// Fetches one page of the file list of a commit detail.
    ///
    /// Large commits split their `files` across pages; the commit metadata
    /// repeats on each page.
    async fn commit_files_page(
        &self,
        full_name: &str,
        sha: &str,
        page: u32,
    ) -> Result<Vec<FileChange>> {
        let mut url = self.repo_url(full_name, &["commits", sha])?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        let detail: CommitDetail = fetch_json(ProviderKind::GitHub, self.get(url)).await?;
        Ok(detail
            .files
            .into_iter()
            .map(|file| FileChange {
                path: file.filename,
                additions: file.additions,
                deletions: file.deletions,
            })
            .collect())
    }

    /// Lists the file paths touched by one pull request.
    async fn pull_request_files(&self, full_name: &str, number: u64) -> Result<Vec<String>> {
        let number = number.to_string();
        let url = self.repo_url(full_name, &["pulls", &number, "files"])?;
        let files: Vec<PullRequestFile> = fetch_json(ProviderKind::GitHub, self.get(url)).await?;
        Ok(files.into_iter().map(|file| file.filename).collect())
    }
}

impl ProviderClient for GitHubClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    fn current_user(&self) -> ProviderFuture<'_, String> {
        Box::pin(async move {
            let url = endpoint(&self.base_url, &["user"])?;
            let user: User = fetch_json(ProviderKind::GitHub, self.get(url)).await?;
            Ok(user.login)
        })
    }

    fn list_repositories(&self) -> ProviderFuture<'_, Vec<Repository>> {
        Box::pin(async move {
            let mut url = endpoint(&self.base_url, &["user", "repos"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &MAX_PAGE_SIZE.to_string())
                .append_pair("sort", "updated")
                .append_pair("direction", "desc");

            let entries: Vec<RepositoryEntry> =
                fetch_json(ProviderKind::GitHub, self.get(url)).await?;
            let mut repositories: Vec<Repository> = entries
                .into_iter()
                .map(|entry| Repository {
                    name: entry.name,
                    full_name: entry.full_name,
                    url: entry.html_url,
                    provider: ProviderKind::GitHub,
                })
                .collect();
            sort_repositories(&mut repositories);

            info!(count = repositories.len(), "Listed GitHub repositories");
            Ok(repositories)
        })
    }

    fn list_open_change_requests<'a>(
        &'a self,
        full_name: &'a str,
    ) -> ProviderFuture<'a, Vec<ChangeRequest>> {
        Box::pin(async move {
            let mut url = self.repo_url(full_name, &["pulls"])?;
            url.query_pairs_mut().append_pair("state", "open");
            let pulls: Vec<PullRequestEntry> =
                fetch_json(ProviderKind::GitHub, self.get(url)).await?;

            let mut change_requests = Vec::with_capacity(pulls.len());
            for pull in pulls {
                let changed_files = self.pull_request_files(full_name, pull.number).await?;
                debug!(
                    number = pull.number,
                    files = changed_files.len(),
                    "Fetched pull request files"
                );
                change_requests.push(ChangeRequest {
                    number: pull.number,
                    title: pull.title,
                    state: pull.state,
                    url: pull.html_url,
                    provider: ProviderKind::GitHub,
                    changed_files,
                });
            }

            info!(
                repository = full_name,
                count = change_requests.len(),
                "Listed open pull requests"
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
            collect_pages(None, |page| self.commit_files_page(full_name, sha, page)).await
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
