use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spanscope", version, about = "Traced tool-calling agent and trace shape checks")]
pub struct CliArgs {
    /// Path to a config.toml (searched upward from the current directory by default)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use the scripted model and the in-memory trace store
    #[arg(long, global = true)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one query through the agent and print the result
    Run(RunArgs),

    /// Run the fixed scenarios and validate their traces
    Check(CheckArgs),

    /// Verify trace store credentials
    AuthCheck,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Query to send (a random canned prompt when omitted)
    #[arg(long, conflicts_with = "scenario")]
    pub query: Option<String>,

    /// Run the query of a named scenario
    #[arg(long)]
    pub scenario: Option<String>,

    #[arg(long)]
    pub user_id: Option<String>,

    #[arg(long)]
    pub session_id: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Only run the named scenario
    #[arg(long)]
    pub scenario: Option<String>,
}
