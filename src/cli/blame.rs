//! Blame command: per-author changed lines over a change request.

use std::io::{self, BufReader};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use super::analyze::{open_session, select_change_request, select_repository, Console};
use super::SessionArgs;
use crate::blame::{aggregate_blame, BlameOptions, BlameReport};
use crate::config::AnalyzerConfig;
use crate::format::format_blame_report;
use crate::provider::ProviderClient;
use crate::utils::settings::Settings;

/// Rendering of the blame report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Ranked plain-text table.
    #[default]
    Text,
    /// Author to line count map as YAML.
    Yaml,
    /// Author to line count map as JSON.
    Json,
}

/// Blame command options.
#[derive(Parser, Debug, Default)]
pub struct BlameCommand {
    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Maximum number of commits read per file (defaults to the whole history).
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_history: Option<usize>,
}

impl BlameCommand {
    /// Runs the interactive blame flow on stdin/stdout.
    pub async fn execute(
        &self,
        session: &SessionArgs,
        settings: &Settings,
        config: &AnalyzerConfig,
    ) -> Result<()> {
        let mut reader = BufReader::new(io::stdin());
        let mut out = io::stdout();
        let mut console = Console::new(&mut reader, &mut out);
        self.run(session, settings, config, &mut console).await
    }

    /// Connects to the provider, then runs the flow on `console`.
    pub async fn run(
        &self,
        session: &SessionArgs,
        settings: &Settings,
        config: &AnalyzerConfig,
        console: &mut Console<'_>,
    ) -> Result<()> {
        let client = open_session(
            session.provider.as_deref(),
            session.token.as_deref(),
            settings,
            config,
            console,
        )
        .await?;
        self.run_with_client(client.as_ref(), config, console).await
    }

    /// Selects a repository and change request, then prints the report.
    pub async fn run_with_client(
        &self,
        client: &dyn ProviderClient,
        config: &AnalyzerConfig,
        console: &mut Console<'_>,
    ) -> Result<()> {
        let repository = select_repository(client, console).await?;
        let Some(change_request) = select_change_request(client, &repository, console).await?
        else {
            return Ok(());
        };

        let options = BlameOptions {
            max_commits_per_file: self.max_history.or(config.max_history),
        };
        let report = aggregate_blame(
            client,
            &repository.full_name,
            change_request.number,
            &change_request.changed_files,
            &options,
        )
        .await
        .with_context(|| {
            format!(
                "Blame analysis of {}{}{} failed",
                repository.full_name,
                client.kind().change_request_sigil(),
                change_request.number
            )
        })?;

        console.say(&render_report(self.format, &report)?)
    }
}

/// Renders `report` in the requested format.
pub fn render_report(format: OutputFormat, report: &BlameReport) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_blame_report(report)),
        OutputFormat::Yaml => {
            serde_yaml::to_string(report).context("Failed to serialize report to YAML")
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
        }
    }
}
