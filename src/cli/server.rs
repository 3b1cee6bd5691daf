//! Server command: serves the analyses over HTTP.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use crate::config::AnalyzerConfig;

/// Server command options.
#[derive(Parser, Debug)]
pub struct ServerCommand {
    /// Port to listen on.
    #[arg(short = 'P', long, default_value_t = 8080)]
    pub port: u16,
}

impl ServerCommand {
    /// Serves until the process is interrupted.
    pub async fn execute(self, config: AnalyzerConfig) -> Result<()> {
        println!("Starting server on port {}...", self.port);
        crate::server::serve(self.port, Arc::new(config)).await
    }
}
