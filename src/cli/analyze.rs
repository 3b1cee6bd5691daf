//! Interactive selection flow shared by the analysis commands.
//!
//! Input and output are injected through [`Console`] so the flow can be
//! driven from tests without a terminal.

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::data::{ChangeRequest, Repository};
use crate::format::{format_change_request_list, format_changed_files, format_repository_list};
use crate::provider::{self, ProviderClient, ProviderKind};
use crate::utils::preflight::resolve_provider_token;
use crate::utils::settings::Settings;

/// Kind of analysis to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    /// Per-author blame over a change request.
    Blame,
    /// History export in code-maat log format.
    Log,
}

/// Line-oriented terminal used by the prompt flow.
pub struct Console<'a> {
    reader: &'a mut (dyn BufRead + Send),
    out: &'a mut (dyn Write + Send),
}

impl<'a> Console<'a> {
    /// Wraps an input reader and an output writer.
    pub fn new(reader: &'a mut (dyn BufRead + Send), out: &'a mut (dyn Write + Send)) -> Self {
        Self { reader, out }
    }

    /// Prints `prompt` and reads one trimmed line. Closed input is an error.
    pub fn prompt_line(&mut self, prompt: &str) -> Result<String> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;

        let mut input = String::new();
        let bytes = self
            .reader
            .read_line(&mut input)
            .context("Failed to read input")?;
        if bytes == 0 {
            bail!("Input closed before a selection was made");
        }
        Ok(input.trim().to_string())
    }

    /// Writes `text` followed by a newline.
    pub fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }
}

/// Converts a 1-based menu choice into an index into a list of `len` items.
pub fn parse_selection(input: &str, len: usize) -> Result<usize> {
    match input.trim().parse::<usize>() {
        Ok(choice) if (1..=len).contains(&choice) => Ok(choice - 1),
        _ => bail!("Invalid selection"),
    }
}

/// Asks which analysis to run.
pub fn prompt_analysis_kind(console: &mut Console<'_>) -> Result<AnalysisKind> {
    let input = console.prompt_line("Select analysis type (blame/log): ")?;
    match input.to_lowercase().as_str() {
        "blame" => Ok(AnalysisKind::Blame),
        "log" => Ok(AnalysisKind::Log),
        _ => bail!("Invalid analysis type '{input}'. Must be 'blame' or 'log'"),
    }
}

/// Uses `explicit` when given, otherwise asks for the provider.
pub fn resolve_provider(explicit: Option<&str>, console: &mut Console<'_>) -> Result<ProviderKind> {
    let raw = match explicit {
        Some(raw) => raw.to_string(),
        None => console.prompt_line("Select provider (github/gitlab): ")?,
    };
    Ok(raw.parse::<ProviderKind>()?)
}

/// Resolves a token from the flag, environment or settings, and asks for
/// one as a last resort. The token is never written anywhere.
pub fn resolve_token(
    settings: &Settings,
    kind: ProviderKind,
    explicit: Option<&str>,
    console: &mut Console<'_>,
) -> Result<String> {
    if let Some(token) = resolve_provider_token(settings, kind, explicit) {
        return Ok(token);
    }
    let token = console.prompt_line(&format!("Enter {kind} personal access token: "))?;
    if token.is_empty() {
        bail!("No {kind} access token provided");
    }
    Ok(token)
}

/// Resolves provider and token, then connects and verifies the token.
pub async fn open_session(
    provider: Option<&str>,
    token: Option<&str>,
    settings: &Settings,
    config: &AnalyzerConfig,
    console: &mut Console<'_>,
) -> Result<Box<dyn ProviderClient>> {
    let kind = resolve_provider(provider, console)?;
    let token = resolve_token(settings, kind, token, console)?;
    let client = provider::connect(kind, &token, config.api_url(kind))
        .await
        .with_context(|| format!("Failed to connect to {kind}"))?;
    console.say(&format!("Successfully authenticated with {kind}"))?;
    Ok(client)
}

/// Lists repositories and lets the user pick one.
pub async fn select_repository(
    client: &dyn ProviderClient,
    console: &mut Console<'_>,
) -> Result<Repository> {
    let repositories = client
        .list_repositories()
        .await
        .context("Failed to list repositories")?;
    debug!(count = repositories.len(), "Listed repositories");

    console.say(&format_repository_list(&repositories))?;
    let input = console.prompt_line("Select a repository (number): ")?;
    let index = parse_selection(&input, repositories.len())?;
    let repository = repositories
        .into_iter()
        .nth(index)
        .context("Invalid selection")?;

    console.say(&format!("\nSelected repository: {}", repository.full_name))?;
    console.say(&format!("URL: {}", repository.url))?;
    Ok(repository)
}

/// Lists open change requests of `repository` and lets the user pick one.
///
/// Returns `None` after telling the user when nothing is open.
pub async fn select_change_request(
    client: &dyn ProviderClient,
    repository: &Repository,
    console: &mut Console<'_>,
) -> Result<Option<ChangeRequest>> {
    let kind = client.kind();
    let change_requests = client
        .list_open_change_requests(&repository.full_name)
        .await
        .with_context(|| {
            format!(
                "Failed to list open change requests of {}",
                repository.full_name
            )
        })?;

    if change_requests.is_empty() {
        console.say(&format!(
            "\nNo open {} found.",
            kind.change_request_label().to_lowercase()
        ))?;
        return Ok(None);
    }

    console.say(&format_change_request_list(kind, &change_requests))?;
    let input = console.prompt_line("Select a change request (number): ")?;
    let index = parse_selection(&input, change_requests.len())?;
    let change_request = change_requests
        .into_iter()
        .nth(index)
        .context("Invalid selection")?;

    console.say(&format!(
        "\nSelected: {}{} - {}",
        kind.change_request_sigil(),
        change_request.number,
        change_request.title
    ))?;
    console.say(&format!("URL: {}", change_request.url))?;
    console.say(&format_changed_files(&change_request.changed_files))?;
    Ok(Some(change_request))
}
