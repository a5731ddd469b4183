//! `tessera pull <collection> <artifact>`: fetch one template.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use tessera_sync::{reconcile_pull, Decision, PullOptions, PullStep, ReconcileOutcome, WriteResult};

use super::{artifact_ref, open_context, print_summary, print_warnings};

/// Arguments for `tessera pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    pub collection: String,
    pub artifact: String,

    /// Overwrite local edits without asking.
    #[arg(long, conflicts_with = "decision")]
    pub force: bool,

    /// Answer a conflict up front: overwrite | backup | skip | cancel.
    #[arg(long, value_name = "DECISION")]
    pub decision: Option<Decision>,
}

impl PullArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let ctx = open_context(root)?;
        let artifact = artifact_ref(&self.collection, &self.artifact)?;

        let step = reconcile_pull(&ctx, &artifact, PullOptions { force: self.force })
            .with_context(|| format!("pull failed for '{artifact}'"))?;
        let outcome = match step {
            PullStep::Done(outcome) => outcome,
            PullStep::AwaitingDecision(pending) => {
                println!("! '{artifact}' has local edits since the last pull:");
                print_summary(pending.summary());
                let Some(decision) = self.decision else {
                    println!("Nothing written. Re-run with --decision overwrite|backup|skip|cancel.");
                    return Ok(());
                };
                pending
                    .resume(&ctx, decision)
                    .with_context(|| format!("pull failed for '{artifact}'"))?
            }
        };

        print_outcome(&outcome);
        Ok(())
    }
}

fn print_outcome(outcome: &ReconcileOutcome) {
    print_warnings(&outcome.warnings);
    let artifact = &outcome.artifact;
    match outcome.decision_taken {
        Decision::Overwrite | Decision::BackupThenOverwrite => {
            let written = outcome
                .writes
                .iter()
                .filter(|w| matches!(w, WriteResult::Written { .. }))
                .count();
            println!(
                "✓ '{artifact}' pulled ({written} written, {} unchanged)",
                outcome.writes.len() - written
            );
            if let Some(snapshot) = &outcome.snapshot {
                println!("  backup: {}", snapshot.display());
            }
            for write in &outcome.writes {
                match write {
                    WriteResult::Written { path } => println!("  ✎  {}", path.display()),
                    WriteResult::Unchanged { path } => println!("  ·  {}", path.display()),
                }
            }
        }
        Decision::Skip => println!("· '{artifact}' skipped, local copy kept"),
        Decision::Cancel => println!("✗ '{artifact}' cancelled, nothing written"),
    }
}
