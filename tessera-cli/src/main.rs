//! Tessera: keep local template bundles in sync with a remote store.
//!
//! # Usage
//!
//! ```text
//! tessera [--workspace DIR] [--verbose] init (--remote-dir PATH | --remote-url URL) [--collection NAME=a,b]
//! tessera pull <collection> <artifact> [--force] [--decision overwrite|backup|skip|cancel]
//! tessera push <collection> <artifact> [--yes] [--decision overwrite|backup|skip|cancel]
//! tessera sync <collection> [--dry-run] [--json] [--on-conflict DECISION]
//! tessera status [<collection>] [--json]
//! tessera diff <collection> <artifact>
//! ```

mod commands;
mod remote;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs, init::InitArgs, pull::PullArgs, push::PushArgs, status::StatusArgs, sync::SyncArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tessera",
    version,
    about = "Reconcile local template bundles with a remote store",
    long_about = None,
)]
struct Cli {
    /// Workspace root (the directory holding tessera.yaml).
    #[arg(long, short = 'w', global = true, default_value = ".")]
    workspace: PathBuf,

    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create tessera.yaml in the workspace.
    Init(InitArgs),

    /// Fetch one template from the remote, guarding local edits.
    Pull(PullArgs),

    /// Publish one local template, guarding remote changes.
    Push(PushArgs),

    /// Pull every template declared for a collection.
    Sync(SyncArgs),

    /// Show local drift for every tracked template.
    Status(StatusArgs),

    /// Show what a pull would change for one template.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = cli.workspace;
    match cli.command {
        Commands::Init(args) => args.run(&root),
        Commands::Pull(args) => args.run(&root),
        Commands::Push(args) => args.run(&root),
        Commands::Sync(args) => args.run(&root),
        Commands::Status(args) => args.run(&root),
        Commands::Diff(args) => args.run(&root),
    }
}

/// Logs go to stderr so stdout stays parseable (`--json`).
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
