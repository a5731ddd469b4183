//! `tessera init (--remote-dir PATH | --remote-url URL) [--collection NAME=a,b]...`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args};

use tessera_core::{
    config::{self, config_path_at, TEMPLATES_DIR},
    types::check_id,
    ArtifactId, CollectionId, RemoteConfig, WorkspaceConfig,
};

/// Create `tessera.yaml` in the workspace root.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("remote").required(true).args(["remote_dir", "remote_url"])))]
pub struct InitArgs {
    /// Directory of JSON envelopes (`<dir>/<collection>/<artifact>.json`).
    #[arg(long, value_name = "PATH")]
    pub remote_dir: Option<PathBuf>,

    /// Base URL of an HTTP template API.
    #[arg(long, value_name = "URL")]
    pub remote_url: Option<String>,

    /// Environment variable holding the bearer token for --remote-url.
    #[arg(long, value_name = "VAR", requires = "remote_url")]
    pub token_env: Option<String>,

    /// Declare a collection and its templates, e.g. `onboarding=welcome,reset`.
    #[arg(long = "collection", value_name = "NAME=a,b")]
    pub collections: Vec<String>,

    /// Bulk-sync worker limit.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Replace an existing tessera.yaml.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let config_path = config_path_at(root);
        if config_path.exists() && !self.force {
            bail!(
                "'{}' already exists; pass --force to replace it",
                config_path.display()
            );
        }

        let remote = match (self.remote_dir, self.remote_url) {
            (Some(path), _) => RemoteConfig::Directory { path },
            (None, Some(url)) => RemoteConfig::Http {
                url,
                token_env: self.token_env,
            },
            (None, None) => bail!("provide --remote-dir or --remote-url"),
        };

        let mut config = WorkspaceConfig::new(remote);
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.collections = parse_collections(&self.collections)?;

        config::save_at(root, &config)
            .with_context(|| format!("failed to write '{}'", config_path.display()))?;
        let templates = root.join(TEMPLATES_DIR);
        std::fs::create_dir_all(&templates)
            .with_context(|| format!("failed to create '{}'", templates.display()))?;

        println!("✓ Initialized tessera workspace at '{}'", root.display());
        for (collection, ids) in &config.collections {
            println!("  {collection}: {} templates", ids.len());
        }
        Ok(())
    }
}

fn parse_collections(entries: &[String]) -> Result<BTreeMap<CollectionId, Vec<ArtifactId>>> {
    let mut collections = BTreeMap::new();
    for entry in entries {
        let Some((name, list)) = entry.split_once('=') else {
            bail!("invalid --collection '{entry}'; expected NAME=a,b");
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("invalid --collection '{entry}'; collection name is empty");
        }
        check_id("collection", name)?;
        let mut ids = Vec::new();
        for id in list.split(',').map(str::trim).filter(|id| !id.is_empty()) {
            check_id("artifact", id)?;
            ids.push(ArtifactId::from(id));
        }
        collections.insert(CollectionId::from(name), ids);
    }
    Ok(collections)
}
