//! Log command: exports commit history in code-maat format.

use std::fs;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use super::analyze::{open_session, select_repository, Console};
use super::SessionArgs;
use crate::config::AnalyzerConfig;
use crate::history_log::{export_history_log, parse_since, DEFAULT_SINCE};
use crate::provider::ProviderClient;
use crate::utils::settings::Settings;

/// Log command options.
#[derive(Parser, Debug)]
pub struct LogCommand {
    /// Earliest commit date to export.
    #[arg(long, value_name = "YYYY-MM-DD", default_value = DEFAULT_SINCE)]
    pub since: String,

    /// Writes the log to a file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl Default for LogCommand {
    fn default() -> Self {
        Self {
            since: DEFAULT_SINCE.to_string(),
            output: None,
        }
    }
}

impl LogCommand {
    /// Runs the interactive export flow on stdin/stdout.
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
        parse_since(&self.since)?;
        let client = open_session(
            session.provider.as_deref(),
            session.token.as_deref(),
            settings,
            config,
            console,
        )
        .await?;
        self.run_with_client(client.as_ref(), console).await
    }

    /// Selects a repository and exports its history.
    pub async fn run_with_client(
        &self,
        client: &dyn ProviderClient,
        console: &mut Console<'_>,
    ) -> Result<()> {
        let since = parse_since(&self.since)?;
        let repository = select_repository(client, console).await?;
        let log = export_history_log(client, &repository.full_name, since)
            .await
            .with_context(|| format!("Failed to export history of {}", repository.full_name))?;

        match &self.output {
            Some(path) => {
                fs::write(path, &log.text)
                    .with_context(|| format!("Failed to write log file: {}", path.display()))?;
                console.say(&format!(
                    "\nExported {} commits since {since} to {}",
                    log.commits,
                    path.display()
                ))
            }
            None => {
                console.say("")?;
                console.say(log.text.trim_end())
            }
        }
    }
}
