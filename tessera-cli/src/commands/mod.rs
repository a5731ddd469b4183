//! Subcommand implementations and the helpers they share.

pub mod diff;
pub mod init;
pub mod pull;
pub mod push;
pub mod status;
pub mod sync;

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use tessera_core::{ArtifactRef, Workspace};
use tessera_sync::{ChangeDetail, ChangeSummary, ReconcileContext};

use crate::remote;

/// Load the workspace at `root` and connect its remote.
pub fn open_context(root: &Path) -> Result<ReconcileContext> {
    let workspace = Workspace::open(root)
        .with_context(|| format!("failed to open workspace at '{}'", root.display()))?;
    let remote = remote::connect(&workspace.config.remote).context("failed to set up the remote store")?;
    Ok(ReconcileContext::new(workspace, remote))
}

/// Reference from command-line ids; `..` and separators are refused.
pub fn artifact_ref(collection: &str, artifact: &str) -> Result<ArtifactRef> {
    Ok(ArtifactRef::parse(collection, artifact)?)
}

/// Print a change summary: unified diffs where available, one line per file
/// otherwise.
pub fn print_summary(summary: &ChangeSummary) {
    for file in &summary.files {
        match &file.detail {
            ChangeDetail::Diff { unified, .. } => print!("{unified}"),
            ChangeDetail::Omitted {
                old_lines,
                new_lines,
            } => println!(
                "{}: {} ({old_lines} → {new_lines} lines, diff omitted)",
                file.file, file.status
            ),
            ChangeDetail::Deleted => println!("{}: deleted", file.file),
            ChangeDetail::Unreadable(reason) => println!("{}: unreadable ({reason})", file.file),
        }
    }
    print_warnings(&summary.warnings);
}

pub fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
}
