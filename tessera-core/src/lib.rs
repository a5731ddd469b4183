//! Tessera core library: domain types, workspace configuration, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes, [`TrackedFile`] and [`TemplateBundle`]
//! - [`envelope`]: decode of remote responses into [`TemplateBundle`]
//! - [`config`]: `tessera.yaml` load / save and the on-disk [`Workspace`] layout
//! - [`error`]: [`ConfigError`], [`RemoteError`]

pub mod config;
pub mod envelope;
pub mod error;
pub mod types;

pub use config::{RemoteConfig, Workspace, WorkspaceConfig};
pub use envelope::BundleEnvelope;
pub use error::{ConfigError, RemoteError};
pub use types::{ArtifactId, ArtifactRef, CollectionId, TemplateBundle, TrackedFile};
