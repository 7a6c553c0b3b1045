//! Tally — versions billing-platform configuration in a file repository.
//!
//! # Usage
//!
//! ```text
//! tally [--config <path>] extract --form <extract.json>
//! tally [--config <path>] plan --form <request.json> [--all-workflows]
//! tally [--config <path>] deploy --form <request.json> [--all-workflows]
//! tally [--config <path>] status [--json] [--changes]
//! ```
//!
//! Without `--config`, configuration is read from `~/.tally/config.yaml`.
//! Log verbosity follows `RUST_LOG` (default `info`).

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    extract::ExtractArgs,
    phase::{PhaseArgs, Stage},
    status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    about = "Extract, plan and deploy billing-platform configuration between environments",
    long_about = None,
)]
struct Cli {
    /// Configuration file to use instead of ~/.tally/config.yaml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pull configuration from a source environment into the repository.
    Extract(ExtractArgs),

    /// Compare the repository with a target environment and write deploy payloads.
    Plan(PhaseArgs),

    /// Replay the last plan against the target environment.
    Deploy(PhaseArgs),

    /// Summarize the last plan output.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => args.run(cli.config),
        Commands::Plan(args) => args.run(Stage::Plan, cli.config),
        Commands::Deploy(args) => args.run(Stage::Deploy, cli.config),
        Commands::Status(args) => args.run(cli.config),
    }
}
