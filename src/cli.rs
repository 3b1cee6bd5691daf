//! CLI interface for repo-analyzer.

use std::io::{self, BufReader};

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod analyze;
pub mod blame;
pub mod log;
pub mod server;

use crate::config::AnalyzerConfig;
use crate::utils::settings::Settings;
use analyze::{prompt_analysis_kind, AnalysisKind, Console};

/// repo-analyzer: contribution analysis for GitHub and GitLab repositories.
#[derive(Parser)]
#[command(name = "repo-analyzer")]
#[command(
    about = "Analyzes who touched the files of open pull and merge requests",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Git provider (github or gitlab).
    #[arg(short, long, global = true)]
    pub provider: Option<String>,

    /// Personal access token.
    #[arg(short, long, global = true)]
    pub token: Option<String>,

    /// Analysis to run. Asks interactively when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available analyses.
#[derive(Subcommand)]
pub enum Commands {
    /// Runs git-blame analysis on the files of a pull or merge request.
    Blame(blame::BlameCommand),
    /// Exports the repository's commit history in code-maat log format.
    Log(log::LogCommand),
    /// Starts the HTTP server.
    Server(server::ServerCommand),
}

/// Provider selection shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct SessionArgs {
    /// Provider selector as given on the command line.
    pub provider: Option<String>,
    /// Token as given on the command line.
    pub token: Option<String>,
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        let settings = Settings::load()?;
        let config = AnalyzerConfig::from_settings(&settings)?;
        let session = SessionArgs {
            provider: self.provider,
            token: self.token,
        };

        match self.command {
            Some(Commands::Blame(cmd)) => cmd.execute(&session, &settings, &config).await,
            Some(Commands::Log(cmd)) => cmd.execute(&session, &settings, &config).await,
            Some(Commands::Server(cmd)) => cmd.execute(config).await,
            None => {
                let mut reader = BufReader::new(io::stdin());
                let mut out = io::stdout();
                let mut console = Console::new(&mut reader, &mut out);
                match prompt_analysis_kind(&mut console)? {
                    AnalysisKind::Blame => {
                        blame::BlameCommand::default()
                            .run(&session, &settings, &config, &mut console)
                            .await
                    }
                    AnalysisKind::Log => {
                        log::LogCommand::default()
                            .run(&session, &settings, &config, &mut console)
                            .await
                    }
                }
            }
        }
    }
}
