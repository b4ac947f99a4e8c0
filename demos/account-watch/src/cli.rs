use clap::{Args, Parser, Subcommand};

/// Command-line interface for the account-watch demo.
#[derive(Debug, Parser)]
#[command(
    name = "account-watch",
    about = "Tracks one ledger account against an in-process simulated node"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Runs the watcher against the simulated node.
    Run(RunCmd),
}

#[derive(Debug, Args)]
pub struct RunCmd {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    pub config: Option<String>,
}
