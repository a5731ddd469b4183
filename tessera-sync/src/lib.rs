//! # tessera-sync
//!
//! Local–remote reconciliation for template bundles.
//!
//! Single artifacts go through [`reconcile_pull`] and [`reconcile_push`];
//! both return either a finished [`ReconcileOutcome`] or a pending value the
//! caller resumes with a [`Decision`]. Whole collections go through
//! [`reconcile_sync_collection`].
//!
//! Per-artifact state lives under `<artifact_dir>/.tessera/`: the
//! fingerprint baseline (`hashes.json`) and pre-overwrite snapshots
//! (`backups/<timestamp>/`).

pub mod backup;
pub mod context;
pub mod detect;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod hash_store;
pub mod orchestrator;
pub mod policy;
pub mod reconcile;
pub mod remote;
pub mod writer;

pub use context::ReconcileContext;
pub use detect::{detect, ChangeReport, FileStatus};
pub use diff::{diff, diff_guarded, render_unified, DiffResult};
pub use error::SyncError;
pub use orchestrator::{sync_collection, ArtifactOutcome, SyncOptions, SyncReport, SyncSummary};
pub use policy::{Decision, ReconciliationPolicy};
pub use reconcile::{
    preview_pull, reconcile_pull, reconcile_push, reconcile_sync_collection, ChangeDetail, ChangeSummary,
    PendingPull, PendingPush, PullOptions, PullStep, PushOptions, PushStep, ReconcileOutcome,
};
pub use remote::{MemoryRemote, RemoteStore};
pub use writer::WriteResult;
