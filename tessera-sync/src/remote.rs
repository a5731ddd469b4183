//! The remote store boundary.
//!
//! Transports live outside this crate; they decode whatever the remote
//! sends into a [`TemplateBundle`] before reconciliation sees it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tessera_core::{ArtifactRef, RemoteError, TemplateBundle};

/// Fetch and publish template bundles. Retries are the implementor's job.
pub trait RemoteStore: Send + Sync {
    fn fetch(&self, artifact: &ArtifactRef) -> Result<TemplateBundle, RemoteError>;
    fn publish(&self, artifact: &ArtifactRef, bundle: &TemplateBundle) -> Result<(), RemoteError>;
}

/// In-process remote, for tests and embedding.
///
/// Artifacts marked with [`MemoryRemote::fail`] answer every call with
/// `RemoteError::Unavailable`.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    bundles: Mutex<BTreeMap<ArtifactRef, TemplateBundle>>,
    failing: Mutex<BTreeSet<ArtifactRef>>,
    fetches: AtomicUsize,
    publishes: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, artifact: ArtifactRef, bundle: TemplateBundle) {
        self.bundles
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(artifact, bundle);
    }

    /// Drop the remote copy; later fetches answer `NotFound`.
    pub fn remove(&self, artifact: &ArtifactRef) -> Option<TemplateBundle> {
        self.bundles
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(artifact)
    }

    pub fn fail(&self, artifact: ArtifactRef) {
        self.failing
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(artifact);
    }

    pub fn get(&self, artifact: &ArtifactRef) -> Option<TemplateBundle> {
        self.bundles
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(artifact)
            .cloned()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }

    fn check_available(&self, artifact: &ArtifactRef) -> Result<(), RemoteError> {
        let failing = self.failing.lock().unwrap_or_else(|p| p.into_inner());
        if failing.contains(artifact) {
            return Err(RemoteError::Unavailable(format!("{artifact}: connection refused")));
        }
        Ok(())
    }
}

impl RemoteStore for MemoryRemote {
    fn fetch(&self, artifact: &ArtifactRef) -> Result<TemplateBundle, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_available(artifact)?;
        self.get(artifact).ok_or_else(|| RemoteError::NotFound {
            artifact: artifact.clone(),
        })
    }

    fn publish(&self, artifact: &ArtifactRef, bundle: &TemplateBundle) -> Result<(), RemoteError> {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        self.check_available(artifact)?;
        self.insert(artifact.clone(), bundle.clone());
        Ok(())
    }
}
