//! Error types for tessera-sync.

use std::path::PathBuf;

use thiserror::Error;

use tessera_core::{ArtifactRef, ConfigError, RemoteError};

use crate::policy::PolicyState;

/// All errors that can arise from reconciliation operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (hash store save path).
    #[error("hash store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote store failed; nothing local was touched.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Workspace configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Push requires a local copy, and there is none.
    #[error("no local copy of {artifact} (missing template markup)")]
    MissingLocal { artifact: ArtifactRef },

    /// A decision was supplied to a policy that is not waiting for one.
    #[error("cannot apply a decision in state {state:?}")]
    InvalidTransition { state: PolicyState },

    /// Local files changed between presenting a conflict and resuming it.
    #[error("{artifact} changed while a decision was pending; re-run to review the new state")]
    ChangedSinceReview { artifact: ArtifactRef },

    /// Bulk sync was asked for a collection the workspace does not declare.
    #[error("collection '{0}' is not declared in tessera.yaml")]
    UnknownCollection(String),

    /// The bulk-sync worker pool could not be created.
    #[error("worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
