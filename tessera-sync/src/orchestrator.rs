//! Bulk sync across a collection.
//!
//! Each artifact is handled independently on a bounded rayon pool, under its
//! own artifact lock:
//!
//! - no local copy → fetch + write (`pulled`, or `failed` on any error)
//! - local copy, clean → `skipped`
//! - local copy with edits → `modified`, left untouched and logged
//!
//! With [`SyncOptions::on_conflict`] set, edited artifacts go through the
//! policy in bulk mode instead, where `cancel` only skips that artifact.
//! One artifact's failure never stops the others.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use tessera_core::{ArtifactRef, TrackedFile};

use crate::backup::backup;
use crate::context::ReconcileContext;
use crate::detect::detect;
use crate::error::SyncError;
use crate::policy::{Action, Decision, Mode, ReconciliationPolicy};
use crate::writer::{has_local_copy, write_bundle, WriteResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Classify and count only: no fetches, no writes.
    pub dry_run: bool,
    /// Decision applied to locally edited artifacts. `None` leaves them alone.
    pub on_conflict: Option<Decision>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub pulled: usize,
    pub skipped: usize,
    pub modified: usize,
    pub failed: usize,
}

impl SyncSummary {
    fn record(&mut self, outcome: &ArtifactOutcome) {
        match outcome {
            ArtifactOutcome::Pulled { .. } | ArtifactOutcome::WouldPull => self.pulled += 1,
            ArtifactOutcome::Skipped => self.skipped += 1,
            ArtifactOutcome::Modified { .. } => self.modified += 1,
            ArtifactOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pulled + self.skipped + self.modified + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Pulled {
        written: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        snapshot: Option<PathBuf>,
    },
    /// Dry run: a pull would have happened.
    WouldPull,
    Skipped,
    Modified { files: Vec<String> },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactResult {
    pub artifact: ArtifactRef,
    #[serde(flatten)]
    pub outcome: ArtifactOutcome,
}

/// Per-artifact outcomes in input order, plus the counters.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub summary: SyncSummary,
    pub artifacts: Vec<ArtifactResult>,
}

/// Sync every artifact in `artifacts`.
///
/// Only fails if the worker pool cannot be built; per-artifact errors are
/// counted in the summary.
pub fn sync_collection(
    ctx: &ReconcileContext,
    artifacts: &[ArtifactRef],
    opts: SyncOptions,
) -> Result<SyncReport, SyncError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ctx.worker_limit())
        .build()?;

    let results: Vec<ArtifactResult> = pool.install(|| {
        artifacts
            .par_iter()
            .map(|artifact| ArtifactResult {
                artifact: artifact.clone(),
                outcome: sync_one(ctx, artifact, opts),
            })
            .collect()
    });

    let mut summary = SyncSummary::default();
    for result in &results {
        summary.record(&result.outcome);
    }
    tracing::info!(
        pulled = summary.pulled,
        skipped = summary.skipped,
        modified = summary.modified,
        failed = summary.failed,
        dry_run = opts.dry_run,
        "collection sync finished"
    );
    Ok(SyncReport {
        summary,
        artifacts: results,
    })
}

fn sync_one(ctx: &ReconcileContext, artifact: &ArtifactRef, opts: SyncOptions) -> ArtifactOutcome {
    let dir = ctx.artifact_dir(artifact);
    ctx.with_artifact_lock(&dir, || {
        if !has_local_copy(&dir) {
            return pull_or_preview(ctx, artifact, &dir, opts.dry_run, false);
        }

        let report = detect(&dir, &TrackedFile::names());
        if report.is_clean() {
            tracing::debug!(artifact = %artifact, "clean, skipped");
            return ArtifactOutcome::Skipped;
        }
        let files: Vec<String> = report.changed().map(|c| c.file.clone()).collect();

        let Some(decision) = opts.on_conflict else {
            tracing::warn!(artifact = %artifact, files = ?files, "local edits, left untouched");
            return ArtifactOutcome::Modified { files };
        };

        let mut policy = ReconciliationPolicy::new(Mode::Bulk);
        let action = policy
            .evaluate(&report, false)
            .and_then(|_| policy.decide(decision));
        match action {
            Ok(Action::Write) => pull_or_preview(ctx, artifact, &dir, opts.dry_run, false),
            Ok(Action::BackupThenWrite) => pull_or_preview(ctx, artifact, &dir, opts.dry_run, true),
            Ok(Action::LeaveUntouched) | Ok(Action::Abort) => {
                tracing::warn!(artifact = %artifact, files = ?files, decision = %decision, "local edits kept");
                ArtifactOutcome::Modified { files }
            }
            Err(err) => failed(artifact, err),
        }
    })
}

fn pull_or_preview(
    ctx: &ReconcileContext,
    artifact: &ArtifactRef,
    dir: &Path,
    dry_run: bool,
    with_backup: bool,
) -> ArtifactOutcome {
    if dry_run {
        return ArtifactOutcome::WouldPull;
    }
    let bundle = match ctx.remote().fetch(artifact) {
        Ok(bundle) => bundle,
        Err(err) => return failed(artifact, err.into()),
    };
    let snapshot = if with_backup {
        match backup(dir, &TrackedFile::names()) {
            Ok(path) => Some(path),
            Err(err) => return failed(artifact, err),
        }
    } else {
        None
    };
    match write_bundle(dir, &bundle) {
        Ok(writes) => ArtifactOutcome::Pulled {
            written: writes
                .iter()
                .filter(|w| matches!(w, WriteResult::Written { .. }))
                .count(),
            snapshot,
        },
        Err(err) => failed(artifact, err),
    }
}

fn failed(artifact: &ArtifactRef, err: SyncError) -> ArtifactOutcome {
    tracing::error!(artifact = %artifact, error = %err, "sync failed");
    ArtifactOutcome::Failed {
        error: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use tempfile::TempDir;
    use tessera_core::{RemoteConfig, TemplateBundle, Workspace, WorkspaceConfig};

    use crate::remote::MemoryRemote;

    fn bundle(markup: &str) -> TemplateBundle {
        TemplateBundle {
            markup: markup.to_string(),
            style: String::new(),
            metadata: "{}".to_string(),
        }
    }

    fn context(tmp: &TempDir, remote: Arc<MemoryRemote>) -> ReconcileContext {
        let mut config = WorkspaceConfig::new(RemoteConfig::Directory {
            path: tmp.path().join("remote"),
        });
        config.workers = 2;
        ReconcileContext::new(
            Workspace {
                root: tmp.path().to_path_buf(),
                config,
            },
            remote,
        )
    }

    #[test]
    fn results_keep_input_order() {
        let tmp = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let artifacts: Vec<ArtifactRef> = (0..8)
            .map(|i| ArtifactRef::new("news", format!("a{i}").as_str()))
            .collect();
        for a in &artifacts {
            remote.insert(a.clone(), bundle(&a.to_string()));
        }
        let ctx = context(&tmp, remote);

        let report = sync_collection(&ctx, &artifacts, SyncOptions::default()).unwrap();
        let order: Vec<&ArtifactRef> = report.artifacts.iter().map(|r| &r.artifact).collect();
        assert_eq!(order, artifacts.iter().collect::<Vec<_>>());
        assert_eq!(report.summary.pulled, 8);
    }

    #[test]
    fn second_sync_skips_clean_copies() {
        let tmp = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let a = ArtifactRef::new("news", "a");
        remote.insert(a.clone(), bundle("<p/>"));
        let ctx = context(&tmp, remote);

        sync_collection(&ctx, &[a.clone()], SyncOptions::default()).unwrap();
        let report = sync_collection(&ctx, &[a], SyncOptions::default()).unwrap();
        assert_eq!(
            report.summary,
            SyncSummary {
                skipped: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn bulk_cancel_degrades_to_skip() {
        let tmp = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let a = ArtifactRef::new("news", "a");
        remote.insert(a.clone(), bundle("<p>remote</p>"));
        let ctx = context(&tmp, remote);
        sync_collection(&ctx, &[a.clone()], SyncOptions::default()).unwrap();
        let page = ctx.artifact_dir(&a).join("template.html");
        fs::write(&page, "<p>mine</p>").unwrap();

        let opts = SyncOptions {
            on_conflict: Some(Decision::Cancel),
            ..Default::default()
        };
        let report = sync_collection(&ctx, &[a], opts).unwrap();
        assert_eq!(report.summary.modified, 1);
        assert_eq!(fs::read_to_string(&page).unwrap(), "<p>mine</p>");
    }

    #[test]
    fn bulk_backup_decision_snapshots_then_pulls() {
        let tmp = TempDir::new().unwrap();
        let remote = Arc::new(MemoryRemote::new());
        let a = ArtifactRef::new("news", "a");
        remote.insert(a.clone(), bundle("<p>remote</p>"));
        let ctx = context(&tmp, remote);
        sync_collection(&ctx, &[a.clone()], SyncOptions::default()).unwrap();
        let page = ctx.artifact_dir(&a).join("template.html");
        fs::write(&page, "<p>mine</p>").unwrap();

        let opts = SyncOptions {
            on_conflict: Some(Decision::BackupThenOverwrite),
            ..Default::default()
        };
        let report = sync_collection(&ctx, &[a], opts).unwrap();
        assert_eq!(report.summary.pulled, 1);
        let ArtifactOutcome::Pulled {
            snapshot: Some(snapshot),
            written,
        } = &report.artifacts[0].outcome
        else {
            panic!("expected a pull with snapshot");
        };
        assert_eq!(*written, 1);
        assert_eq!(fs::read_to_string(snapshot.join("template.html")).unwrap(), "<p>mine</p>");
        assert_eq!(fs::read_to_string(&page).unwrap(), "<p>remote</p>");
    }

    #[test]
    fn outcome_serializes_with_flat_tag() {
        let result = ArtifactResult {
            artifact: ArtifactRef::new("news", "a"),
            outcome: ArtifactOutcome::Modified {
                files: vec!["style.css".to_string()],
            },
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["outcome"], "modified");
        assert_eq!(value["files"][0], "style.css");
        assert_eq!(value["artifact"]["collection"], "news");
    }
}
