//! Runtime configuration resolved from the environment and the settings file.

use anyhow::{bail, Result};

use crate::provider::ProviderKind;
use crate::utils::settings::Settings;

/// Environment variable overriding the GitHub API base URL.
pub const GITHUB_API_URL_VAR: &str = "GITHUB_API_URL";
/// Environment variable overriding the GitLab API base URL.
pub const GITLAB_API_URL_VAR: &str = "GITLAB_API_URL";
/// Environment variable capping the history read per file.
pub const MAX_HISTORY_VAR: &str = "REPO_ANALYZER_MAX_HISTORY";

/// Provider endpoints and analysis limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// GitHub REST API base URL.
    pub github_api_url: String,
    /// GitLab REST API base URL, including `/api/v4`.
    pub gitlab_api_url: String,
    /// Upper bound on commits read per file during blame. `None` is unbounded.
    pub max_history: Option<usize>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            github_api_url: ProviderKind::GitHub.default_api_url().to_string(),
            gitlab_api_url: ProviderKind::GitLab.default_api_url().to_string(),
            max_history: None,
        }
    }
}

/// Parses a per-file history cap, which must be at least 1.
fn parse_history_cap(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => bail!("{MAX_HISTORY_VAR} must be a positive integer, got '{raw}'"),
    }
}

impl AnalyzerConfig {
    /// Loads the configuration from `$HOME/.repo-analyzer/settings.json` and
    /// the environment.
    pub fn load() -> Result<Self> {
        Self::from_settings(&Settings::load()?)
    }

    /// Resolves the configuration against already loaded settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let defaults = Self::default();
        let max_history = settings
            .get_env_var(MAX_HISTORY_VAR)
            .map(|raw| parse_history_cap(&raw))
            .transpose()?;

        Ok(Self {
            github_api_url: settings
                .get_env_var(GITHUB_API_URL_VAR)
                .unwrap_or(defaults.github_api_url),
            gitlab_api_url: settings
                .get_env_var(GITLAB_API_URL_VAR)
                .unwrap_or(defaults.gitlab_api_url),
            max_history,
        })
    }

    /// API base URL for `kind`.
    pub fn api_url(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::GitHub => &self.github_api_url,
            ProviderKind::GitLab => &self.gitlab_api_url,
        }
    }
}
