pub mod plan;
pub mod schema;
pub mod serve;
pub mod services;
pub mod trigger;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "khitomer")]
#[command(
    author,
    version,
    about = "Turns tracker tickets into reviewed pull requests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(short, long, global = true, env = "KHITOMER_CONFIG", default_value = "khitomer.yaml")]
    pub config: PathBuf,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the tracker, run pipelines and serve the admin API
    Serve(ServeArgs),

    /// Plan and run a single ticket in the foreground
    Trigger(TriggerArgs),

    /// Print the implementation plan for a ticket without running it
    Plan(PlanArgs),

    /// Print JSON Schema for config validation
    Schema,
}

#[derive(Parser, Clone)]
pub struct ServeArgs {
    /// Override the admin API bind address
    #[arg(long)]
    pub bind: Option<String>,

    /// Serve the admin API without polling the tracker
    #[arg(long)]
    pub no_intake: bool,
}

#[derive(Parser, Clone)]
pub struct TriggerArgs {
    /// Tracker ticket id (e.g. PROJ-42)
    #[arg(long)]
    pub ticket: String,

    /// Repository owner; defaults to the ticket's repository
    #[arg(long)]
    pub owner: Option<String>,

    /// Repository name; defaults to the ticket's repository
    #[arg(long)]
    pub repo: Option<String>,

    /// Base branch; defaults to the ticket's or the configured default
    #[arg(long)]
    pub base: Option<String>,
}

#[derive(Parser, Clone)]
pub struct PlanArgs {
    /// Tracker ticket id (e.g. PROJ-42)
    #[arg(long)]
    pub ticket: String,
}
