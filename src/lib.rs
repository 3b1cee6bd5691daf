//! # repo-analyzer
//!
//! Contribution analysis for GitHub and GitLab repositories.
//!
//! For an open pull request (GitHub) or merge request (GitLab), walks the
//! commit history of every changed file and reports how many changed lines
//! each author is responsible for. The same provider clients also export a
//! repository's history in the code-maat `git2` log format.
//!
//! ## Quick Start
//!
//! ```no_run
//! use repo_analyzer::blame::{analyze_change_request, BlameOptions};
//! use repo_analyzer::format::format_blame_report;
//! use repo_analyzer::provider::{connect, ProviderKind};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let kind = ProviderKind::GitHub;
//! let client = connect(kind, "ghp_...", kind.default_api_url()).await?;
//! let (_, report) =
//!     analyze_change_request(client.as_ref(), "octo/widgets", 7, &BlameOptions::default()).await?;
//! print!("{}", format_blame_report(&report));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod blame;
pub mod cli;
pub mod config;
pub mod data;
pub mod format;
pub mod history_log;
pub mod provider;
pub mod server;
pub mod utils;

pub use crate::cli::Cli;

/// The current version of repo-analyzer.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
