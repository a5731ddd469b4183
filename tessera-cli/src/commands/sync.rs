//! `tessera sync <collection>`: bulk pull of a declared collection.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;

use tessera_core::CollectionId;
use tessera_sync::{reconcile_sync_collection, ArtifactOutcome, Decision, SyncOptions, SyncReport};

use super::open_context;

/// Arguments for `tessera sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Collection declared in tessera.yaml.
    pub collection: String,

    /// Report what would happen without fetching or writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Decision for locally edited templates. Without it they are left alone.
    #[arg(long, value_name = "DECISION")]
    pub on_conflict: Option<Decision>,
}

impl SyncArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let ctx = open_context(root)?;
        let collection = CollectionId::from(self.collection.as_str());
        let opts = SyncOptions {
            dry_run: self.dry_run,
            on_conflict: self.on_conflict,
        };

        let report = reconcile_sync_collection(&ctx, &collection, opts)
            .with_context(|| format!("sync failed for collection '{collection}'"))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize sync JSON")?
            );
        } else {
            print_report(&collection, &report, self.dry_run);
        }

        if report.summary.failed > 0 {
            bail!("{} of {} templates failed", report.summary.failed, report.summary.total());
        }
        Ok(())
    }
}

fn print_report(collection: &CollectionId, report: &SyncReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if report.artifacts.is_empty() {
        println!("{prefix}No templates declared for '{collection}'.");
        return;
    }

    for result in &report.artifacts {
        let artifact = &result.artifact;
        match &result.outcome {
            ArtifactOutcome::Pulled { written, snapshot } => {
                println!("{prefix}✎  {artifact} pulled ({written} written)");
                if let Some(snapshot) = snapshot {
                    println!("     backup: {}", snapshot.display());
                }
            }
            ArtifactOutcome::WouldPull => println!("{prefix}~  {artifact} would be pulled"),
            ArtifactOutcome::Skipped => println!("{prefix}·  {artifact} up to date"),
            ArtifactOutcome::Modified { files } => {
                println!("{prefix}!  {artifact} has local edits ({}), left untouched", files.join(", "))
            }
            ArtifactOutcome::Failed { error } => println!("{prefix}✗  {artifact} failed: {error}"),
        }
    }

    let s = report.summary;
    println!(
        "{prefix}'{collection}': {} pulled, {} skipped, {} modified, {} failed",
        s.pulled, s.skipped, s.modified, s.failed
    );
}
