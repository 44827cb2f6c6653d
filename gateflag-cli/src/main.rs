//! Gateflag: CTF lab provisioner for AWS CloudFormation.
//!
//! # Usage
//!
//! ```text
//! gateflag init [--force]
//! gateflag render [--team <name>]
//! gateflag provision [--team <name>...] [--json]
//! gateflag teardown [--yes] [--json]
//! gateflag rollback <team> [--json]
//! gateflag status [--json]
//! ```
//!
//! Every subcommand accepts `--config <path>` (default `./gateflag.yaml`),
//! `--verbose` and `--json-logs`.

mod commands;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    init::InitArgs, provision::ProvisionArgs, render::RenderArgs, rollback::RollbackArgs,
    status::StatusArgs, teardown::TeardownArgs,
};
use gateflag_core::config::CONFIG_FILE;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "gateflag",
    version,
    about = "Provision and tear down per-team CTF lab stacks on CloudFormation",
    long_about = None,
)]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = CONFIG_FILE, value_name = "PATH")]
    config: PathBuf,

    /// Log at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default gateflag.yaml.
    Init(InitArgs),

    /// Print the substituted templates without contacting AWS.
    Render(RenderArgs),

    /// Deploy the global stack, then every team stack.
    Provision(ProvisionArgs),

    /// Delete every team stack, then the global stack.
    Teardown(TeardownArgs),

    /// Switch a team machine to its other image.
    Rollback(RollbackArgs),

    /// Show the classified state of every managed stack.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose, cli.json_logs);

    let config = cli.config;
    match cli.command {
        Commands::Init(args) => args.run(&config),
        Commands::Render(args) => args.run(&config),
        Commands::Provision(args) => args.run(&config),
        Commands::Teardown(args) => args.run(&config),
        Commands::Rollback(args) => args.run(&config),
        Commands::Status(args) => args.run(&config),
    }
}
