//! `tessera push <collection> <artifact>`: publish one local template.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use tessera_sync::{reconcile_push, Decision, PushOptions, PushStep};

use super::{artifact_ref, open_context, print_summary, print_warnings};

/// Arguments for `tessera push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    pub collection: String,
    pub artifact: String,

    /// Publish even if the remote changed since the last pull.
    #[arg(long, short = 'y', conflicts_with = "decision")]
    pub yes: bool,

    /// Answer a conflict up front: overwrite | backup | skip | cancel.
    #[arg(long, value_name = "DECISION")]
    pub decision: Option<Decision>,
}

impl PushArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let ctx = open_context(root)?;
        let artifact = artifact_ref(&self.collection, &self.artifact)?;

        let step = reconcile_push(&ctx, &artifact, PushOptions { assume_yes: self.yes })
            .with_context(|| format!("push failed for '{artifact}'"))?;
        let outcome = match step {
            PushStep::Done(outcome) => outcome,
            PushStep::AwaitingDecision(pending) => {
                println!("! remote copy of '{artifact}' changed since the last pull:");
                print_summary(pending.summary());
                let Some(decision) = self.decision else {
                    println!("Nothing published. Re-run with --decision overwrite|backup|skip|cancel.");
                    return Ok(());
                };
                pending
                    .resume(&ctx, decision)
                    .with_context(|| format!("push failed for '{artifact}'"))?
            }
        };

        print_warnings(&outcome.warnings);
        if outcome.published {
            println!("✓ '{artifact}' published");
            if let Some(snapshot) = &outcome.snapshot {
                println!("  remote copy saved to: {}", snapshot.display());
            }
            return Ok(());
        }
        match outcome.decision_taken {
            Decision::Cancel => println!("✗ '{artifact}' cancelled, nothing published"),
            _ if outcome.summary.is_none() => println!("✓ '{artifact}': remote already up to date"),
            _ => println!("· '{artifact}' skipped, remote copy kept"),
        }
        Ok(())
    }
}
