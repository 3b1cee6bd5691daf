//! Source-control provider clients and the capability trait they share.

pub mod auth;
pub mod error;
pub mod github;
pub mod gitlab;
#[cfg(test)]
pub(crate) mod test_utils;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::data::{ChangeRequest, CommitRecord, FileChange, Repository};

pub use auth::connect;
pub use error::{ProviderError, Result};
pub use github::GitHubClient;
pub use gitlab::GitLabClient;

/// HTTP request timeout for provider API calls.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest page size both providers accept.
pub const MAX_PAGE_SIZE: usize = 100;

/// Boxed future returned by [`ProviderClient`] operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Supported source-control providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// github.com or GitHub Enterprise.
    GitHub,
    /// gitlab.com or a self-managed GitLab.
    GitLab,
}

impl ProviderKind {
    /// Selector string used on the command line and in HTTP requests.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
        }
    }

    /// Provider's own name for a change request, plural.
    pub const fn change_request_label(self) -> &'static str {
        match self {
            Self::GitHub => "Pull Requests",
            Self::GitLab => "Merge Requests",
        }
    }

    /// Prefix the provider puts in front of change-request numbers.
    pub const fn change_request_sigil(self) -> char {
        match self {
            Self::GitHub => '#',
            Self::GitLab => '!',
        }
    }

    /// Environment variable holding the access token.
    pub const fn token_env_var(self) -> &'static str {
        match self {
            Self::GitHub => "GITHUB_TOKEN",
            Self::GitLab => "GITLAB_TOKEN",
        }
    }

    /// Public API endpoint.
    pub const fn default_api_url(self) -> &'static str {
        match self {
            Self::GitHub => github::DEFAULT_API_URL,
            Self::GitLab => gitlab::DEFAULT_API_URL,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitHub => write!(f, "GitHub"),
            Self::GitLab => write!(f, "GitLab"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "gitlab" => Ok(Self::GitLab),
            _ => Err(ProviderError::UnknownProvider(s.to_string())),
        }
    }
}

/// Capabilities the blame engine needs from a provider.
///
/// Each operation is a single logical request/response exchange (plus
/// pagination where noted). Errors are propagated as-is, nothing is retried.
pub trait ProviderClient: Send + Sync {
    /// Returns which provider this client talks to.
    fn kind(&self) -> ProviderKind;

    /// Returns the handle of the authenticated user. Used to verify tokens.
    fn current_user(&self) -> ProviderFuture<'_, String>;

    /// Lists repositories visible to the authenticated user, sorted by full name.
    fn list_repositories(&self) -> ProviderFuture<'_, Vec<Repository>>;

    /// Lists open change requests together with their changed file paths.
    fn list_open_change_requests<'a>(
        &'a self,
        full_name: &'a str,
    ) -> ProviderFuture<'a, Vec<ChangeRequest>>;

    /// Returns the commits that touched `path`, newest first.
    ///
    /// Follows pagination until exhausted, or until `limit` commits were read.
    fn file_history<'a>(
        &'a self,
        full_name: &'a str,
        path: &'a str,
        limit: Option<usize>,
    ) -> ProviderFuture<'a, Vec<CommitRecord>>;

    /// Returns per-file line counts for a single commit.
    fn commit_changes<'a>(
        &'a self,
        full_name: &'a str,
        sha: &'a str,
    ) -> ProviderFuture<'a, Vec<FileChange>>;

    /// Returns all commits on the default branch since `since`, newest first.
    fn commits_since<'a>(
        &'a self,
        full_name: &'a str,
        since: DateTime<Utc>,
    ) -> ProviderFuture<'a, Vec<CommitRecord>>;
}

/// Finds an open change request by number.
///
/// Fails with [`ProviderError::ChangeRequestNotFound`] when the number is not
/// among the currently open change requests.
pub async fn find_open_change_request(
    client: &dyn ProviderClient,
    full_name: &str,
    number: u64,
) -> Result<ChangeRequest> {
    client
        .list_open_change_requests(full_name)
        .await?
        .into_iter()
        .find(|change_request| change_request.number == number)
        .ok_or_else(|| ProviderError::ChangeRequestNotFound {
            repository: full_name.to_string(),
            number,
        })
}

/// Splits an `owner/name` identifier.
pub fn split_full_name(full_name: &str) -> Result<(&str, &str)> {
    match full_name.split('/').collect::<Vec<_>>().as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => Ok((*owner, *name)),
        _ => Err(ProviderError::InvalidRepositoryName(full_name.to_string())),
    }
}

/// Validates a GitLab project path, which may contain nested groups.
pub fn validate_project_path(full_name: &str) -> Result<&str> {
    let segments: Vec<&str> = full_name.split('/').collect();
    if segments.len() < 2 || segments.iter().any(|segment| segment.is_empty()) {
        return Err(ProviderError::InvalidRepositoryName(full_name.to_string()));
    }
    Ok(full_name)
}

// ── Shared helpers for provider client implementations ─────────────

/// Sorts repositories by full name so selection by index is stable.
pub(crate) fn sort_repositories(repositories: &mut [Repository]) {
    repositories.sort_by(|a, b| a.full_name.cmp(&b.full_name));
}

/// Builds an HTTP client with the standard timeout and user agent.
pub(crate) fn build_http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("repo-analyzer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::NetworkError(format!("Failed to build HTTP client: {e}")))
}

/// Parses a configured API base URL.
pub(crate) fn parse_api_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| ProviderError::InvalidApiUrl(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ProviderError::InvalidApiUrl(raw.to_string()));
    }
    Ok(url)
}

/// Appends percent-encoded path segments to an API base URL.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ProviderError::InvalidApiUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Checks an HTTP response for error status.
///
/// On failure, reads the error body and returns a
/// [`ProviderError::RequestFailed`].
pub(crate) async fn check_error_response(
    provider: ProviderKind,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_else(|e| {
        tracing::debug!("Failed to read error response body: {e}");
        String::new()
    });
    Err(ProviderError::RequestFailed {
        provider,
        status,
        body,
    })
}

/// Sends a request and decodes the JSON body of a successful response.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    provider: ProviderKind,
    request: RequestBuilder,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::NetworkError(e.to_string()))?;
    let response = check_error_response(provider, response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::InvalidResponseFormat(e.to_string()))
}

/// Reads pages of [`MAX_PAGE_SIZE`] items until a short page arrives or
/// `limit` items were collected.
pub(crate) async fn collect_pages<T, F, Fut>(
    limit: Option<usize>,
    mut fetch_page: F,
) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut items = Vec::new();
    if limit == Some(0) {
        return Ok(items);
    }
    let mut page = 1;
    loop {
        let batch = fetch_page(page).await?;
        let exhausted = batch.len() < MAX_PAGE_SIZE;
        items.extend(batch);
        if let Some(limit) = limit {
            if items.len() >= limit {
                items.truncate(limit);
                break;
            }
        }
        if exhausted {
            break;
        }
        page += 1;
    }
    Ok(items)
}
