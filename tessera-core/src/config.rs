//! Workspace configuration and on-disk layout.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   tessera.yaml                    (workspace config)
//!   templates/
//!     <collection>/
//!       <artifact>/
//!         template.html             (tracked)
//!         style.css                 (tracked)
//!         meta.json                 (tracked)
//!         .tessera/
//!           hashes.json             (fingerprint baseline)
//!           backups/<timestamp>/    (pre-overwrite snapshots)
//! ```
//!
//! # API pattern
//!
//! Every function that touches the filesystem takes an explicit `root` so
//! tests can point it at a `TempDir`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{check_id, ArtifactId, ArtifactRef, CollectionId};

pub const CONFIG_FILE: &str = "tessera.yaml";
pub const TEMPLATES_DIR: &str = "templates";
pub const STATE_DIR: &str = ".tessera";

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_DIFF_MAX_LINES: usize = 2000;

// ---------------------------------------------------------------------------
// Config document
// ---------------------------------------------------------------------------

/// Where the remote store lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RemoteConfig {
    /// A directory of JSON envelopes, `<path>/<collection>/<artifact>.json`.
    Directory { path: PathBuf },
    /// An HTTP API. The bearer token, if any, is read from the env var named
    /// by `token_env` at call time and never stored in the config.
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_env: Option<String>,
    },
}

/// Root of `tessera.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub remote: RemoteConfig,
    /// Upper bound on concurrently reconciled artifacts during bulk sync.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Files longer than this many lines get a coarse change marker instead
    /// of a line diff.
    #[serde(default = "default_diff_max_lines")]
    pub diff_max_lines: usize,
    /// Declared collections: collection id → artifact ids, in sync order.
    #[serde(default)]
    pub collections: BTreeMap<CollectionId, Vec<ArtifactId>>,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_diff_max_lines() -> usize {
    DEFAULT_DIFF_MAX_LINES
}

impl WorkspaceConfig {
    pub fn new(remote: RemoteConfig) -> Self {
        Self {
            remote,
            workers: DEFAULT_WORKERS,
            diff_max_lines: DEFAULT_DIFF_MAX_LINES,
            collections: BTreeMap::new(),
        }
    }

    /// Worker limit, never below one.
    pub fn worker_limit(&self) -> usize {
        self.workers.max(1)
    }

    /// Artifacts declared for `collection`, or `None` if it is not declared.
    pub fn artifacts_in(&self, collection: &CollectionId) -> Option<Vec<ArtifactRef>> {
        self.collections.get(collection).map(|ids| {
            ids.iter()
                .map(|id| ArtifactRef {
                    collection: collection.clone(),
                    artifact: id.clone(),
                })
                .collect()
        })
    }

    /// Every declared collection and artifact id must be a plain path segment.
    pub fn validate_ids(&self) -> Result<(), ConfigError> {
        for (collection, ids) in &self.collections {
            check_id("collection", &collection.0)?;
            for id in ids {
                check_id("artifact", &id.0)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// `<root>/tessera.yaml`: pure, no I/O.
pub fn config_path_at(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Load `<root>/tessera.yaml`.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path
/// and line context) if malformed, `ConfigError::InvalidId` if a declared id
/// would escape `templates/`.
pub fn load_at(root: &Path) -> Result<WorkspaceConfig, ConfigError> {
    let path = config_path_at(root);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    let mut config: WorkspaceConfig =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })?;
    if let RemoteConfig::Directory { path } = &mut config.remote {
        *path = expand_home(path);
    }
    config.validate_ids()?;
    Ok(config)
}

/// Atomically save `<root>/tessera.yaml` (`.tmp` sibling, then rename).
pub fn save_at(root: &Path, config: &WorkspaceConfig) -> Result<(), ConfigError> {
    std::fs::create_dir_all(root)?;
    let path = config_path_at(root);
    let tmp_path = path.with_file_name(format!("{CONFIG_FILE}.tmp"));

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// A loaded workspace: its root directory plus parsed config.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: WorkspaceConfig,
}

impl Workspace {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = root.into();
        let config = load_at(&root)?;
        Ok(Self { root, config })
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(TEMPLATES_DIR)
    }

    /// `<root>/templates/<collection>/<artifact>/`
    pub fn artifact_dir(&self, artifact: &ArtifactRef) -> PathBuf {
        self.templates_dir()
            .join(&artifact.collection.0)
            .join(&artifact.artifact.0)
    }

    /// Artifact directories present on disk for `collection`, sorted.
    pub fn local_artifacts(&self, collection: &CollectionId) -> Result<Vec<ArtifactRef>, ConfigError> {
        let dir = self.templates_dir().join(&collection.0);
        if !dir.exists() {
            return Ok(vec![]);
        }
        let mut ids: Vec<ArtifactId> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| ArtifactId::from(e.file_name().to_string_lossy().into_owned()))
            .collect();
        ids.sort();
        Ok(ids
            .into_iter()
            .map(|artifact| ArtifactRef {
                collection: collection.clone(),
                artifact,
            })
            .collect())
    }
}

/// `<artifact_dir>/.tessera/`
pub fn state_dir(artifact_dir: &Path) -> PathBuf {
    artifact_dir.join(STATE_DIR)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
