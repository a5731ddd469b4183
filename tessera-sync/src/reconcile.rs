//! Single-artifact entry points: pull, push and the collection sync wrapper.
//!
//! A pull or push either finishes in one call or returns a pending value
//! ([`PendingPull`], [`PendingPush`]) describing the conflict. The caller
//! shows the summary, collects a [`Decision`] however it likes, and calls
//! `resume`. Nothing is written while a decision is outstanding.
//!
//! ## Pull
//!
//! 1. Detect local drift against the baseline.
//! 2. Fetch the remote bundle. A failure here returns before any write.
//! 3. Local edits that already equal the incoming content are not drift.
//! 4. Clean (or forced) → write + re-stamp. Otherwise → `AwaitingDecision`
//!    with a diff of local content against the incoming content.
//!
//! ## Push
//!
//! 1. Read the local bundle (markup required).
//! 2. Fetch the remote copy and classify it against the baseline: a remote
//!    that moved since the last pull is the conflict here, including a file
//!    the remote gained after it. A remote with no copy at all has nothing
//!    to lose and is published directly.
//! 3. Clean (or `assume_yes`) → publish + re-stamp. Otherwise → pending.

use std::path::{Path, PathBuf};

use tessera_core::{ArtifactRef, CollectionId, RemoteError, TemplateBundle, TrackedFile};

use crate::backup::{backup, backup_bundle};
use crate::context::ReconcileContext;
use crate::detect::{classify_remote, detect, observe, ChangeReport, FileStatus, Observation};
use crate::diff::{diff_guarded, render_unified, DiffResult, GuardedDiff};
use crate::error::SyncError;
use crate::fingerprint::fingerprint_bytes;
use crate::hash_store;
use crate::orchestrator::{sync_collection, SyncOptions, SyncReport};
use crate::policy::{Action, Decision, Mode, ReconciliationPolicy};
use crate::writer::{read_bundle, read_optional, restamp, write_bundle, WriteResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct PullOptions {
    /// Overwrite local edits without asking.
    pub force: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PushOptions {
    /// Publish over remote changes without asking.
    pub assume_yes: bool,
}

// ---------------------------------------------------------------------------
// Change summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeDetail {
    /// Line diff plus its unified rendering.
    Diff { result: DiffResult, unified: String },
    /// Too large to diff; line counts only.
    Omitted { old_lines: usize, new_lines: usize },
    /// The file was removed locally.
    Deleted,
    /// The file could not be read; treated as modified.
    Unreadable(String),
}

impl ChangeDetail {
    /// Diff `old` → `new` for `file`, headers labelled `<side>/<file>`.
    fn between(file: &str, old: (&str, &str), new: (&str, &str), max_lines: usize) -> Self {
        let ((old_side, old_text), (new_side, new_text)) = (old, new);
        match diff_guarded(old_text, new_text, max_lines) {
            GuardedDiff::Full(result) => ChangeDetail::Diff {
                unified: render_unified(
                    old_text,
                    new_text,
                    &format!("{old_side}/{file}"),
                    &format!("{new_side}/{file}"),
                ),
                result,
            },
            GuardedDiff::Omitted {
                old_lines,
                new_lines,
            } => ChangeDetail::Omitted {
                old_lines,
                new_lines,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub file: String,
    pub status: FileStatus,
    pub detail: ChangeDetail,
}

/// What a pending decision would change, file by file.
///
/// For a pull, diffs run from the local file to the incoming remote
/// content. For a push, from the remote copy to the local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSummary {
    pub artifact: ArtifactRef,
    pub files: Vec<FileSummary>,
    pub warnings: Vec<String>,
}

impl ChangeSummary {
    /// Added plus removed lines over every fully diffed file.
    pub fn lines_changed(&self) -> usize {
        self.files
            .iter()
            .map(|f| match &f.detail {
                ChangeDetail::Diff { result, .. } => result.lines_changed(),
                _ => 0,
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Result of a finished single-artifact operation.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub artifact: ArtifactRef,
    pub decision_taken: Decision,
    /// Present when a conflict was reviewed.
    pub summary: Option<ChangeSummary>,
    pub snapshot: Option<PathBuf>,
    /// Local writes performed by a pull.
    pub writes: Vec<WriteResult>,
    /// Whether a push reached the remote.
    pub published: bool,
    pub warnings: Vec<String>,
}

impl ReconcileOutcome {
    fn new(artifact: ArtifactRef, decision_taken: Decision) -> Self {
        Self {
            artifact,
            decision_taken,
            summary: None,
            snapshot: None,
            writes: Vec::new(),
            published: false,
            warnings: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pull
// ---------------------------------------------------------------------------

pub enum PullStep {
    Done(ReconcileOutcome),
    AwaitingDecision(PendingPull),
}

/// A pull paused on a conflict. Holds the already-fetched remote content.
#[derive(Debug)]
pub struct PendingPull {
    artifact: ArtifactRef,
    incoming: TemplateBundle,
    report: ChangeReport,
    summary: ChangeSummary,
    policy: ReconciliationPolicy,
}

impl PendingPull {
    pub fn artifact(&self) -> &ArtifactRef {
        &self.artifact
    }

    pub fn summary(&self) -> &ChangeSummary {
        &self.summary
    }

    /// Apply `decision`. Writing decisions fail with
    /// [`SyncError::ChangedSinceReview`] if local files moved in the meantime.
    pub fn resume(self, ctx: &ReconcileContext, decision: Decision) -> Result<ReconcileOutcome, SyncError> {
        let PendingPull {
            artifact,
            incoming,
            report,
            summary,
            mut policy,
        } = self;
        let dir = ctx.artifact_dir(&artifact);

        ctx.with_artifact_lock(&dir, || -> Result<ReconcileOutcome, SyncError> {
            if writes_content(decision) {
                let reviewed: Vec<(String, Observation)> = report
                    .entries
                    .iter()
                    .map(|e| (e.file.clone(), e.observed.clone()))
                    .collect();
                if observe(&dir, &TrackedFile::names()) != reviewed {
                    return Err(SyncError::ChangedSinceReview { artifact });
                }
            }
            let action = policy.decide(decision)?;
            let mut outcome = apply_pull(&dir, &artifact, &policy, action, &incoming)?;
            outcome.warnings = report.warnings;
            outcome.summary = Some(summary);
            Ok(outcome)
        })
    }
}

/// Pull one artifact from the remote.
pub fn reconcile_pull(
    ctx: &ReconcileContext,
    artifact: &ArtifactRef,
    opts: PullOptions,
) -> Result<PullStep, SyncError> {
    artifact.validate()?;
    let dir = ctx.artifact_dir(artifact);
    ctx.with_artifact_lock(&dir, || -> Result<PullStep, SyncError> {
        let report = detect(&dir, &TrackedFile::names());
        let incoming = ctx.remote().fetch(artifact)?;
        tracing::debug!(artifact = %artifact, "fetched remote bundle");

        let report = settle_matching_edits(report, &incoming);
        let mut policy = ReconciliationPolicy::new(Mode::Interactive);
        policy.evaluate(&report, opts.force)?;
        if policy.is_awaiting_decision() {
            let summary = pull_summary(&dir, artifact, &report, &incoming, ctx.diff_max_lines());
            tracing::info!(artifact = %artifact, files = summary.files.len(), "local edits, decision needed");
            return Ok(PullStep::AwaitingDecision(PendingPull {
                artifact: artifact.clone(),
                incoming,
                report,
                summary,
                policy,
            }));
        }

        let action = policy
            .action()
            .ok_or(SyncError::InvalidTransition { state: policy.state() })?;
        let mut outcome = apply_pull(&dir, artifact, &policy, action, &incoming)?;
        outcome.warnings = report.warnings;
        Ok(PullStep::Done(outcome))
    })
}

fn apply_pull(
    dir: &Path,
    artifact: &ArtifactRef,
    policy: &ReconciliationPolicy,
    action: Action,
    incoming: &TemplateBundle,
) -> Result<ReconcileOutcome, SyncError> {
    let decision = policy
        .decision_taken()
        .ok_or(SyncError::InvalidTransition { state: policy.state() })?;
    let mut outcome = ReconcileOutcome::new(artifact.clone(), decision);
    match action {
        Action::Write => {
            outcome.writes = write_bundle(dir, incoming)?;
        }
        Action::BackupThenWrite => {
            outcome.snapshot = Some(backup(dir, &TrackedFile::names())?);
            outcome.writes = write_bundle(dir, incoming)?;
        }
        Action::LeaveUntouched | Action::Abort => {
            tracing::info!(artifact = %artifact, decision = %decision, "local copy left untouched");
        }
    }
    Ok(outcome)
}

/// Local edits whose bytes already equal the incoming content lose nothing on
/// overwrite; mark them `Unchanged` so they never ask for a decision.
fn settle_matching_edits(mut report: ChangeReport, incoming: &TemplateBundle) -> ChangeReport {
    for entry in report.entries.iter_mut() {
        if entry.status != FileStatus::Modified {
            continue;
        }
        let Observation::Seen(current) = &entry.observed else {
            continue;
        };
        let Some(file) = TrackedFile::from_file_name(&entry.file) else {
            continue;
        };
        if *current == fingerprint_bytes(incoming.content(file).as_bytes()) {
            tracing::debug!(file = %entry.file, "local edit already matches incoming");
            entry.status = FileStatus::Unchanged;
        }
    }
    report
}

fn pull_summary(
    dir: &Path,
    artifact: &ArtifactRef,
    report: &ChangeReport,
    incoming: &TemplateBundle,
    max_lines: usize,
) -> ChangeSummary {
    let files = report
        .changed()
        .map(|change| {
            let detail = match (&change.status, &change.observed) {
                (FileStatus::Deleted, _) => ChangeDetail::Deleted,
                (_, Observation::Unreadable(reason)) => ChangeDetail::Unreadable(reason.clone()),
                _ => match read_optional(&dir.join(&change.file)) {
                    Ok(local) => ChangeDetail::between(
                        &change.file,
                        ("local", local.as_str()),
                        ("remote", incoming_content(incoming, &change.file)),
                        max_lines,
                    ),
                    Err(err) => ChangeDetail::Unreadable(err.to_string()),
                },
            };
            FileSummary {
                file: change.file.clone(),
                status: change.status,
                detail,
            }
        })
        .collect();
    ChangeSummary {
        artifact: artifact.clone(),
        files,
        warnings: report.warnings.clone(),
    }
}

fn incoming_content<'a>(bundle: &'a TemplateBundle, file: &str) -> &'a str {
    TrackedFile::from_file_name(file)
        .map(|f| bundle.content(f))
        .unwrap_or_default()
}

fn writes_content(decision: Decision) -> bool {
    matches!(decision, Decision::Overwrite | Decision::BackupThenOverwrite)
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

pub enum PushStep {
    Done(ReconcileOutcome),
    AwaitingDecision(PendingPush),
}

/// A push paused because the remote changed since the last pull.
#[derive(Debug)]
pub struct PendingPush {
    artifact: ArtifactRef,
    local: TemplateBundle,
    remote_current: Option<TemplateBundle>,
    summary: ChangeSummary,
    policy: ReconciliationPolicy,
}

impl PendingPush {
    pub fn artifact(&self) -> &ArtifactRef {
        &self.artifact
    }

    pub fn summary(&self) -> &ChangeSummary {
        &self.summary
    }

    /// Apply `decision`. Writing decisions fail with
    /// [`SyncError::ChangedSinceReview`] if the local bundle was edited after
    /// the summary was produced.
    pub fn resume(self, ctx: &ReconcileContext, decision: Decision) -> Result<ReconcileOutcome, SyncError> {
        let PendingPush {
            artifact,
            local,
            remote_current,
            summary,
            mut policy,
        } = self;
        let dir = ctx.artifact_dir(&artifact);

        ctx.with_artifact_lock(&dir, || -> Result<ReconcileOutcome, SyncError> {
            if writes_content(decision) && read_bundle(&dir, &artifact)? != local {
                return Err(SyncError::ChangedSinceReview { artifact });
            }
            let action = policy.decide(decision)?;
            let mut outcome = apply_push(ctx, &dir, &artifact, &policy, action, &local, remote_current.as_ref())?;
            outcome.warnings = summary.warnings.clone();
            outcome.summary = Some(summary);
            Ok(outcome)
        })
    }
}

/// Publish the local copy of one artifact.
pub fn reconcile_push(
    ctx: &ReconcileContext,
    artifact: &ArtifactRef,
    opts: PushOptions,
) -> Result<PushStep, SyncError> {
    artifact.validate()?;
    let dir = ctx.artifact_dir(artifact);
    ctx.with_artifact_lock(&dir, || -> Result<PushStep, SyncError> {
        let local = read_bundle(&dir, artifact)?;
        let remote_current = match ctx.remote().fetch(artifact) {
            Ok(bundle) => Some(bundle),
            Err(RemoteError::NotFound { .. }) => None,
            Err(err) => return Err(err.into()),
        };

        if remote_current.as_ref() == Some(&local) {
            tracing::info!(artifact = %artifact, "remote already matches local copy");
            return Ok(PushStep::Done(ReconcileOutcome::new(artifact.clone(), Decision::Skip)));
        }

        let load = hash_store::load(&dir);
        let store_warning = load.warning();
        let mut report = classify_remote(&load.into_map(), remote_current.as_ref());
        report.warnings.extend(store_warning);

        let summary = push_summary(artifact, &report, remote_current.as_ref(), &local, ctx.diff_max_lines());
        let mut policy = ReconciliationPolicy::new(Mode::Interactive);
        policy.evaluate(&report, opts.assume_yes)?;
        if policy.is_awaiting_decision() {
            tracing::info!(artifact = %artifact, "remote changed since last pull, decision needed");
            return Ok(PushStep::AwaitingDecision(PendingPush {
                artifact: artifact.clone(),
                local,
                remote_current,
                summary,
                policy,
            }));
        }

        let action = policy
            .action()
            .ok_or(SyncError::InvalidTransition { state: policy.state() })?;
        let mut outcome = apply_push(ctx, &dir, artifact, &policy, action, &local, remote_current.as_ref())?;
        outcome.warnings = summary.warnings;
        Ok(PushStep::Done(outcome))
    })
}

fn apply_push(
    ctx: &ReconcileContext,
    dir: &Path,
    artifact: &ArtifactRef,
    policy: &ReconciliationPolicy,
    action: Action,
    local: &TemplateBundle,
    remote_current: Option<&TemplateBundle>,
) -> Result<ReconcileOutcome, SyncError> {
    let decision = policy
        .decision_taken()
        .ok_or(SyncError::InvalidTransition { state: policy.state() })?;
    let mut outcome = ReconcileOutcome::new(artifact.clone(), decision);
    match action {
        Action::Write | Action::BackupThenWrite => {
            if let (Action::BackupThenWrite, Some(remote)) = (action, remote_current) {
                outcome.snapshot = Some(backup_bundle(dir, remote)?);
            }
            ctx.remote().publish(artifact, local)?;
            tracing::info!(artifact = %artifact, "published");
            outcome.published = true;
            restamp(dir, &TrackedFile::names())?;
        }
        Action::LeaveUntouched | Action::Abort => {
            tracing::info!(artifact = %artifact, decision = %decision, "push not performed");
        }
    }
    Ok(outcome)
}

fn push_summary(
    artifact: &ArtifactRef,
    report: &ChangeReport,
    remote: Option<&TemplateBundle>,
    local: &TemplateBundle,
    max_lines: usize,
) -> ChangeSummary {
    let files = TrackedFile::ALL
        .iter()
        .filter_map(|file| {
            let before = remote.map(|b| b.content(*file)).unwrap_or_default();
            let after = local.content(*file);
            if before == after {
                return None;
            }
            let name = file.file_name();
            Some(FileSummary {
                file: name.to_string(),
                status: report.status_of(name).unwrap_or(FileStatus::Unchanged),
                detail: ChangeDetail::between(name, ("remote", before), ("local", after), max_lines),
            })
        })
        .collect();
    ChangeSummary {
        artifact: artifact.clone(),
        files,
        warnings: report.warnings.clone(),
    }
}

// ---------------------------------------------------------------------------
// Preview and collection sync
// ---------------------------------------------------------------------------

/// What a pull would change right now, without touching anything locally.
pub fn preview_pull(ctx: &ReconcileContext, artifact: &ArtifactRef) -> Result<ChangeSummary, SyncError> {
    artifact.validate()?;
    let dir = ctx.artifact_dir(artifact);
    let incoming = ctx.remote().fetch(artifact)?;
    let report = detect(&dir, &TrackedFile::names());

    let mut files = Vec::new();
    for (file, remote_text) in incoming.files() {
        let name = file.file_name();
        let status = report.status_of(name).unwrap_or(FileStatus::Unchanged);
        let detail = match read_optional(&dir.join(name)) {
            Ok(local) if local == remote_text => continue,
            Ok(local) => ChangeDetail::between(name, ("local", local.as_str()), ("remote", remote_text), ctx.diff_max_lines()),
            Err(err) => ChangeDetail::Unreadable(err.to_string()),
        };
        files.push(FileSummary {
            file: name.to_string(),
            status,
            detail,
        });
    }
    Ok(ChangeSummary {
        artifact: artifact.clone(),
        files,
        warnings: report.warnings,
    })
}

/// Bulk-sync every artifact declared for `collection`.
pub fn reconcile_sync_collection(
    ctx: &ReconcileContext,
    collection: &CollectionId,
    opts: SyncOptions,
) -> Result<SyncReport, SyncError> {
    let artifacts = ctx
        .workspace()
        .config
        .artifacts_in(collection)
        .ok_or_else(|| SyncError::UnknownCollection(collection.to_string()))?;
    sync_collection(ctx, &artifacts, opts)
}
