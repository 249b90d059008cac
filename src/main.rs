use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod api;
mod cli;
mod config;
mod error;
mod github;
mod intake;
mod model;
mod orchestrator;
mod pipeline;
mod planner;
mod provider;
mod runtime;
mod tracker;

#[cfg(test)]
mod testutil;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("khitomer=debug")
        } else {
            EnvFilter::new("khitomer=info")
        }
    });

    if cli.json_logs {
        fmt().json().with_env_filter(filter).with_target(false).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }

    match cli.command {
        Commands::Serve(args) => cli::serve::execute(&cli.config, args).await,
        Commands::Trigger(args) => cli::trigger::execute(&cli.config, args).await,
        Commands::Plan(args) => cli::plan::execute(&cli.config, args).await,
        Commands::Schema => cli::schema::execute(),
    }
}
