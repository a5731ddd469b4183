use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use tessera_core::{ArtifactRef, RemoteConfig, TemplateBundle, TrackedFile, Workspace, WorkspaceConfig};
use tessera_sync::{
    detect,
    fingerprint::compute_fingerprint,
    hash_store,
    reconcile_pull, reconcile_push, reconcile_sync_collection, ArtifactOutcome, Decision, MemoryRemote,
    PendingPull, PendingPush, PullOptions, PullStep, PushOptions, PushStep, ReconcileContext, SyncError,
    SyncOptions, SyncSummary,
};

fn bundle(markup: &str) -> TemplateBundle {
    TemplateBundle {
        markup: markup.to_string(),
        style: "h1 { font-size: 2em; }\n".to_string(),
        metadata: "{\"subject\": \"Welcome\"}\n".to_string(),
    }
}

fn workspace(tmp: &TempDir, collections: &[(&str, &[&str])]) -> Workspace {
    let mut config = WorkspaceConfig::new(RemoteConfig::Directory {
        path: tmp.path().join("remote"),
    });
    config.collections = collections
        .iter()
        .map(|(c, ids)| ((*c).into(), ids.iter().map(|id| (*id).into()).collect()))
        .collect();
    Workspace {
        root: tmp.path().to_path_buf(),
        config,
    }
}

fn setup(tmp: &TempDir) -> (ReconcileContext, Arc<MemoryRemote>, ArtifactRef) {
    let remote = Arc::new(MemoryRemote::new());
    let artifact = ArtifactRef::new("onboarding", "welcome");
    remote.insert(artifact.clone(), bundle("<h1>Hello</h1>\n<p>v1</p>\n"));
    let ctx = ReconcileContext::new(workspace(tmp, &[]), remote.clone());
    (ctx, remote, artifact)
}

fn pull_clean(ctx: &ReconcileContext, artifact: &ArtifactRef) {
    match reconcile_pull(ctx, artifact, PullOptions::default()).expect("pull") {
        PullStep::Done(outcome) => assert_eq!(outcome.decision_taken, Decision::Overwrite),
        PullStep::AwaitingDecision(p) => panic!("unexpected conflict: {:?}", p.summary()),
    }
}

fn expect_pending_pull(ctx: &ReconcileContext, artifact: &ArtifactRef) -> PendingPull {
    match reconcile_pull(ctx, artifact, PullOptions::default()).expect("pull") {
        PullStep::AwaitingDecision(p) => p,
        PullStep::Done(outcome) => panic!("expected a conflict, got {:?}", outcome.decision_taken),
    }
}

fn expect_pending_push(ctx: &ReconcileContext, artifact: &ArtifactRef) -> PendingPush {
    match reconcile_push(ctx, artifact, PushOptions::default()).expect("push") {
        PushStep::AwaitingDecision(p) => p,
        PushStep::Done(outcome) => panic!("expected a conflict, got {:?}", outcome.decision_taken),
    }
}

/// Raw bytes of everything under `dir`, keyed by relative path.
fn snapshot_tree(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
        for entry in fs::read_dir(dir).expect("read dir") {
            let path = entry.expect("entry").path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).expect("relative").display().to_string();
                out.insert(rel, fs::read(&path).expect("read file"));
            }
        }
    }
    let mut out = BTreeMap::new();
    if dir.exists() {
        walk(dir, dir, &mut out);
    }
    out
}

#[test]
fn cancel_leaves_every_byte_unchanged() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, remote, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);

    let dir = ctx.artifact_dir(&artifact);
    fs::write(dir.join("template.html"), "<h1>Hello</h1>\n<p>local edit</p>\n").expect("edit");
    remote.insert(artifact.clone(), bundle("<h1>Hello</h1>\n<p>v2</p>\n"));
    let before = snapshot_tree(&dir);

    let pending = expect_pending_pull(&ctx, &artifact);
    assert_eq!(pending.summary().lines_changed(), 2);
    let outcome = pending.resume(&ctx, Decision::Cancel).expect("resume");

    assert_eq!(outcome.decision_taken, Decision::Cancel);
    assert!(outcome.writes.is_empty());
    assert_eq!(snapshot_tree(&dir), before);
}

#[test]
fn backup_snapshot_matches_pre_overwrite_fingerprints() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, remote, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);

    let dir = ctx.artifact_dir(&artifact);
    fs::write(dir.join("template.html"), "<h1>Hello</h1>\n<p>mine</p>\n").expect("edit");
    fs::remove_file(dir.join("style.css")).expect("delete style");
    let before: Vec<_> = TrackedFile::names()
        .into_iter()
        .map(|name| (name, compute_fingerprint(&dir.join(name)).expect("fingerprint")))
        .collect();
    remote.insert(artifact.clone(), bundle("<h1>Hello</h1>\n<p>v2</p>\n"));

    let pending = expect_pending_pull(&ctx, &artifact);
    let outcome = pending
        .resume(&ctx, Decision::BackupThenOverwrite)
        .expect("resume");
    let snapshot = outcome.snapshot.expect("snapshot path");

    for (name, fingerprint) in before {
        let saved = compute_fingerprint(&snapshot.join(name)).expect("snapshot fingerprint");
        assert_eq!(saved, fingerprint, "{name} in snapshot");
    }
    assert_eq!(
        fs::read_to_string(dir.join("template.html")).expect("read"),
        "<h1>Hello</h1>\n<p>v2</p>\n"
    );
}

#[test]
fn overwrite_then_detect_is_clean() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, _, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);

    let dir = ctx.artifact_dir(&artifact);
    fs::write(dir.join("meta.json"), "{}").expect("edit");
    let pending = expect_pending_pull(&ctx, &artifact);
    pending.resume(&ctx, Decision::Overwrite).expect("resume");

    assert!(detect(&dir, &TrackedFile::names()).is_clean());
}

#[test]
fn fetch_failure_leaves_files_and_baseline_untouched() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, remote, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);

    let dir = ctx.artifact_dir(&artifact);
    fs::write(dir.join("template.html"), "mine").expect("edit");
    let before = snapshot_tree(&dir);
    remote.fail(artifact.clone());

    let err = reconcile_pull(&ctx, &artifact, PullOptions { force: true })
        .err()
        .expect("fetch must fail");
    assert!(matches!(err, SyncError::Remote(_)), "got {err:?}");
    assert_eq!(snapshot_tree(&dir), before);
}

#[test]
fn edit_while_pending_is_refused() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, _, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);

    let page = ctx.artifact_dir(&artifact).join("template.html");
    fs::write(&page, "first edit").expect("edit");
    let pending = expect_pending_pull(&ctx, &artifact);
    fs::write(&page, "second edit").expect("edit again");

    let err = pending
        .resume(&ctx, Decision::Overwrite)
        .expect_err("must refuse");
    assert!(matches!(err, SyncError::ChangedSinceReview { .. }));
    assert_eq!(fs::read_to_string(&page).expect("read"), "second edit");
}

#[test]
fn corrupt_store_is_a_first_pull_with_warning() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, _, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);

    let dir = ctx.artifact_dir(&artifact);
    fs::write(dir.join("template.html"), "mine").expect("edit");
    fs::write(hash_store::store_path(&dir), "not json").expect("corrupt store");

    match reconcile_pull(&ctx, &artifact, PullOptions::default()).expect("pull") {
        PullStep::Done(outcome) => {
            assert_eq!(outcome.decision_taken, Decision::Overwrite);
            assert_eq!(outcome.warnings.len(), 1);
        }
        PullStep::AwaitingDecision(_) => panic!("corrupt store must not produce a conflict"),
    }
    assert!(detect(&dir, &TrackedFile::names()).is_clean());
}

#[test]
fn push_publishes_local_edits_and_restamps() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, remote, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);

    let dir = ctx.artifact_dir(&artifact);
    fs::write(dir.join("template.html"), "<h1>Edited</h1>\n").expect("edit");

    match reconcile_push(&ctx, &artifact, PushOptions::default()).expect("push") {
        PushStep::Done(outcome) => {
            assert!(outcome.published);
            assert_eq!(outcome.decision_taken, Decision::Overwrite);
        }
        PushStep::AwaitingDecision(p) => panic!("unexpected conflict: {:?}", p.summary()),
    }
    assert_eq!(remote.get(&artifact).expect("remote copy").markup, "<h1>Edited</h1>\n");
    assert!(detect(&dir, &TrackedFile::names()).is_clean());
}

#[test]
fn push_over_remote_changes_waits_for_a_decision() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, remote, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);

    let dir = ctx.artifact_dir(&artifact);
    fs::write(dir.join("template.html"), "<h1>Local</h1>\n").expect("edit");
    let theirs = bundle("<h1>Someone else</h1>\n");
    remote.insert(artifact.clone(), theirs.clone());

    let pending = expect_pending_push(&ctx, &artifact);
    assert_eq!(pending.summary().files.len(), 1);
    let outcome = pending
        .resume(&ctx, Decision::BackupThenOverwrite)
        .expect("resume");

    let snapshot = outcome.snapshot.expect("remote copy backed up");
    assert_eq!(
        fs::read_to_string(snapshot.join("template.html")).expect("read"),
        theirs.markup
    );
    assert_eq!(remote.get(&artifact).expect("remote").markup, "<h1>Local</h1>\n");
}

#[test]
fn push_skip_does_not_publish() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, remote, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);
    fs::write(ctx.artifact_dir(&artifact).join("template.html"), "mine").expect("edit");
    remote.insert(artifact.clone(), bundle("theirs"));

    let outcome = expect_pending_push(&ctx, &artifact)
        .resume(&ctx, Decision::Skip)
        .expect("resume");
    assert!(!outcome.published);
    assert_eq!(remote.publish_count(), 0);
}

#[test]
fn push_does_not_wipe_a_file_the_remote_gained_after_the_last_sync() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, remote, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);

    // Drop the stylesheet locally and publish, so the baseline no longer
    // records style.css.
    let dir = ctx.artifact_dir(&artifact);
    fs::remove_file(dir.join("style.css")).expect("remove style");
    match reconcile_push(&ctx, &artifact, PushOptions::default()).expect("push") {
        PushStep::Done(outcome) => assert!(outcome.published),
        PushStep::AwaitingDecision(p) => panic!("unexpected conflict: {:?}", p.summary()),
    }
    assert!(remote.get(&artifact).expect("remote").style.is_empty());

    // A teammate adds a stylesheet on the remote; we edit markup and push.
    let mut theirs = remote.get(&artifact).expect("remote");
    theirs.style = "body { color: teal; }\n".to_string();
    remote.insert(artifact.clone(), theirs);
    fs::write(dir.join("template.html"), "<h1>Mine</h1>\n").expect("edit");

    let pending = expect_pending_push(&ctx, &artifact);
    let files: Vec<&str> = pending.summary().files.iter().map(|f| f.file.as_str()).collect();
    assert!(files.contains(&"style.css"), "got {files:?}");
    assert_eq!(remote.get(&artifact).expect("remote").style, "body { color: teal; }\n");
}

#[test]
fn push_republishes_when_the_remote_copy_was_deleted() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, remote, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);

    let dir = ctx.artifact_dir(&artifact);
    fs::write(dir.join("template.html"), "<h1>Kept</h1>\n").expect("edit");
    remote.remove(&artifact).expect("remote copy existed");

    match reconcile_push(&ctx, &artifact, PushOptions::default()).expect("push") {
        PushStep::Done(outcome) => {
            assert!(outcome.published);
            assert_eq!(outcome.decision_taken, Decision::Overwrite);
            assert!(outcome.snapshot.is_none());
        }
        PushStep::AwaitingDecision(p) => panic!("unexpected conflict: {:?}", p.summary()),
    }
    let published = remote.get(&artifact).expect("published again");
    assert_eq!(published.markup, "<h1>Kept</h1>\n");
    assert_eq!(published.style, bundle("").style);
    assert!(detect(&dir, &TrackedFile::names()).is_clean());
}

#[test]
fn pull_accepts_local_edits_that_already_match_the_remote() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, remote, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);

    let next = "<h1>Hello</h1>\n<p>v2</p>\n";
    fs::write(ctx.artifact_dir(&artifact).join("template.html"), next).expect("edit");
    remote.insert(artifact.clone(), bundle(next));

    pull_clean(&ctx, &artifact);
    assert!(detect(&ctx.artifact_dir(&artifact), &TrackedFile::names()).is_clean());
}

#[test]
fn pull_still_asks_when_only_some_edits_match_the_remote() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, remote, artifact) = setup(&tmp);
    pull_clean(&ctx, &artifact);

    let dir = ctx.artifact_dir(&artifact);
    let next = "<h1>Hello</h1>\n<p>v2</p>\n";
    fs::write(dir.join("template.html"), next).expect("edit markup");
    fs::write(dir.join("style.css"), "h1 { color: red; }\n").expect("edit style");
    remote.insert(artifact.clone(), bundle(next));

    let pending = expect_pending_pull(&ctx, &artifact);
    let files: Vec<&str> = pending.summary().files.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(files, vec!["style.css"]);
}

#[test]
fn ids_that_escape_the_workspace_are_refused_before_any_fetch() {
    let tmp = TempDir::new().expect("tmp");
    let (ctx, remote, _) = setup(&tmp);
    let escaping = ArtifactRef::new("..", "welcome");

    let err = reconcile_pull(&ctx, &escaping, PullOptions::default()).err().expect("refused");
    assert!(matches!(err, SyncError::Config(_)), "got {err}");
    let err = reconcile_push(&ctx, &escaping, PushOptions::default()).err().expect("refused");
    assert!(matches!(err, SyncError::Config(_)), "got {err}");
    assert_eq!(remote.fetch_count(), 0);
    assert!(!tmp.path().join("welcome").exists());
}

#[test]
fn bulk_sync_counts_pulled_modified_and_failed() {
    let tmp = TempDir::new().expect("tmp");
    let remote = Arc::new(MemoryRemote::new());
    let fresh = ArtifactRef::new("news", "fresh");
    let edited = ArtifactRef::new("news", "edited");
    let broken = ArtifactRef::new("news", "broken");
    for a in [&fresh, &edited, &broken] {
        remote.insert(a.clone(), bundle(&format!("<p>{a}</p>\n")));
    }
    let ctx = ReconcileContext::new(
        workspace(&tmp, &[("news", &["fresh", "edited", "broken"])]),
        remote.clone(),
    );

    // Only `edited` has a local copy; `fresh` and `broken` need a fetch.
    pull_clean(&ctx, &edited);
    fs::write(ctx.artifact_dir(&edited).join("template.html"), "local").expect("edit");
    remote.fail(broken.clone());

    let report = reconcile_sync_collection(&ctx, &"news".into(), SyncOptions::default()).expect("sync");
    assert_eq!(
        report.summary,
        SyncSummary {
            pulled: 1,
            skipped: 0,
            modified: 1,
            failed: 1
        }
    );
    assert!(matches!(report.artifacts[0].outcome, ArtifactOutcome::Pulled { .. }));
    assert!(matches!(
        &report.artifacts[1].outcome,
        ArtifactOutcome::Modified { files } if files == &["template.html".to_string()]
    ));
    assert!(matches!(report.artifacts[2].outcome, ArtifactOutcome::Failed { .. }));
    assert_eq!(
        fs::read_to_string(ctx.artifact_dir(&edited).join("template.html")).expect("read"),
        "local"
    );
}

#[test]
fn dry_run_matches_counts_without_fetching_or_writing() {
    let tmp = TempDir::new().expect("tmp");
    let remote = Arc::new(MemoryRemote::new());
    let fresh = ArtifactRef::new("news", "fresh");
    let edited = ArtifactRef::new("news", "edited");
    remote.insert(fresh.clone(), bundle("fresh"));
    remote.insert(edited.clone(), bundle("edited"));
    let ctx = ReconcileContext::new(workspace(&tmp, &[("news", &["fresh", "edited"])]), remote.clone());

    pull_clean(&ctx, &edited);
    fs::write(ctx.artifact_dir(&edited).join("style.css"), "local").expect("edit");
    let fetches = remote.fetch_count();
    let before = snapshot_tree(&ctx.workspace().templates_dir());

    let dry = reconcile_sync_collection(&ctx, &"news".into(), SyncOptions {
        dry_run: true,
        ..Default::default()
    })
    .expect("dry run");

    assert_eq!(remote.fetch_count(), fetches);
    assert_eq!(snapshot_tree(&ctx.workspace().templates_dir()), before);
    assert!(!ctx.artifact_dir(&fresh).exists());

    let real = reconcile_sync_collection(&ctx, &"news".into(), SyncOptions::default()).expect("sync");
    assert_eq!(dry.summary, real.summary);
}
