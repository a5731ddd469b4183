//! Per-invocation reconciliation context.
//!
//! Everything an operation needs travels through [`ReconcileContext`]: the
//! workspace, the remote, and the per-artifact lock table. There is no
//! process-wide state, so independent contexts can run side by side.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use tessera_core::{ArtifactRef, Workspace};

use crate::remote::RemoteStore;

pub struct ReconcileContext {
    workspace: Workspace,
    remote: Arc<dyn RemoteStore>,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl ReconcileContext {
    pub fn new(workspace: Workspace, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            workspace,
            remote,
            locks: DashMap::new(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn remote(&self) -> &dyn RemoteStore {
        self.remote.as_ref()
    }

    pub fn artifact_dir(&self, artifact: &ArtifactRef) -> PathBuf {
        self.workspace.artifact_dir(artifact)
    }

    pub fn diff_max_lines(&self) -> usize {
        self.workspace.config.diff_max_lines
    }

    pub fn worker_limit(&self) -> usize {
        self.workspace.config.worker_limit()
    }

    /// Run `f` while holding the lock for `artifact_dir`.
    ///
    /// One reconciliation per artifact directory at a time; different
    /// directories never contend.
    pub fn with_artifact_lock<T>(&self, artifact_dir: &Path, f: impl FnOnce() -> T) -> T {
        // Clone the Arc out so the map shard is released before blocking.
        let lock = self
            .locks
            .entry(artifact_dir.to_path_buf())
            .or_default()
            .clone();
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());
        f()
    }
}
