//! `tessera diff <collection> <artifact>`: show what a pull would change.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use tessera_sync::preview_pull;

use super::{artifact_ref, open_context, print_summary};

/// Arguments for `tessera diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    pub collection: String,
    pub artifact: String,
}

impl DiffArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let ctx = open_context(root)?;
        let artifact = artifact_ref(&self.collection, &self.artifact)?;

        let summary = preview_pull(&ctx, &artifact).with_context(|| format!("diff failed for '{artifact}'"))?;
        if summary.is_empty() {
            println!("No differences for '{artifact}'.");
            return Ok(());
        }
        print_summary(&summary);
        Ok(())
    }
}
