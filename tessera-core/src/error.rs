//! Error types for tessera-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ArtifactRef;

/// All errors that can arise from workspace configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, disk full, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse workspace config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// No `tessera.yaml` at the expected location.
    #[error("workspace config not found at {path}; run `tessera init` first")]
    NotFound { path: PathBuf },

    /// A collection or artifact id that is not a single plain path segment.
    #[error("invalid {kind} id '{id}': {reason}")]
    InvalidId {
        kind: &'static str,
        id: String,
        reason: &'static str,
    },
}

/// Failures reported by a remote store transport.
///
/// Retries and backoff are the transport's business; callers treat every
/// variant as final for the current operation.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote has no artifact with this id.
    #[error("artifact {artifact} not found on remote")]
    NotFound { artifact: ArtifactRef },

    /// Transport-level failure (connection refused, timeout, 5xx, unreadable mirror).
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The remote answered but refused the request.
    #[error("remote rejected {artifact}: {reason}")]
    Rejected { artifact: ArtifactRef, reason: String },

    /// The response body did not match any known envelope shape.
    #[error("failed to decode remote response: {0}")]
    Decode(#[from] serde_json::Error),
}
