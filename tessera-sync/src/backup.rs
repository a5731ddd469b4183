//! Pre-overwrite snapshots.
//!
//! Each snapshot is a new directory `<artifact_dir>/.tessera/backups/<stamp>/`
//! where `<stamp>` is a UTC timestamp such as `20261018T093012.481Z`, with a
//! `-N` suffix if two snapshots land in the same millisecond. Files are
//! copied byte for byte under their tracked names.

use std::path::{Path, PathBuf};

use chrono::Utc;

use tessera_core::{config::state_dir, TemplateBundle};

use crate::error::{io_err, SyncError};

pub const BACKUPS_DIR: &str = "backups";

/// `<artifact_dir>/.tessera/backups/`
pub fn backup_root(artifact_dir: &Path) -> PathBuf {
    state_dir(artifact_dir).join(BACKUPS_DIR)
}

/// Snapshot the tracked files that currently exist under `artifact_dir`.
///
/// Missing files are skipped. Returns the snapshot directory.
pub fn backup(artifact_dir: &Path, tracked: &[&str]) -> Result<PathBuf, SyncError> {
    let snapshot = create_snapshot_dir(artifact_dir)?;
    let mut copied = 0usize;
    for name in tracked {
        let source = artifact_dir.join(name);
        if !source.exists() {
            tracing::debug!(file = %name, "not present, nothing to back up");
            continue;
        }
        let target = snapshot.join(name);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        std::fs::copy(&source, &target).map_err(|e| io_err(&source, e))?;
        copied += 1;
    }
    tracing::info!(snapshot = %snapshot.display(), files = copied, "backup written");
    Ok(snapshot)
}

/// Snapshot in-memory content, e.g. the remote's copy before a push
/// replaces it.
pub fn backup_bundle(artifact_dir: &Path, bundle: &TemplateBundle) -> Result<PathBuf, SyncError> {
    let snapshot = create_snapshot_dir(artifact_dir)?;
    for (file, content) in bundle.files() {
        let target = snapshot.join(file.file_name());
        std::fs::write(&target, content).map_err(|e| io_err(&target, e))?;
    }
    tracing::info!(snapshot = %snapshot.display(), "remote copy backed up");
    Ok(snapshot)
}

/// Existing snapshot directories, oldest first.
pub fn list_snapshots(artifact_dir: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let root = backup_root(artifact_dir);
    if !root.exists() {
        return Ok(vec![]);
    }
    let mut snapshots: Vec<PathBuf> = std::fs::read_dir(&root)
        .map_err(|e| io_err(&root, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    snapshots.sort();
    Ok(snapshots)
}

fn create_snapshot_dir(artifact_dir: &Path) -> Result<PathBuf, SyncError> {
    let root = backup_root(artifact_dir);
    std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;

    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
    let mut candidate = root.join(&stamp);
    let mut suffix = 1;
    loop {
        // `create_dir` fails on an existing path, which makes the name claim atomic.
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                candidate = root.join(format!("{stamp}-{suffix}"));
                suffix += 1;
            }
            Err(err) => return Err(io_err(&candidate, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    use crate::fingerprint::compute_fingerprint;

    const TRACKED: &[&str] = &["template.html", "style.css", "meta.json"];

    #[test]
    fn copies_existing_files_verbatim_and_skips_missing() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("template.html"), b"<p>\r\nhi</p>").unwrap();
        fs::write(tmp.path().join("style.css"), b"p{}").unwrap();

        let snapshot = backup(tmp.path(), TRACKED).unwrap();
        assert!(snapshot.starts_with(backup_root(tmp.path())));
        for name in ["template.html", "style.css"] {
            assert_eq!(
                compute_fingerprint(&snapshot.join(name)).unwrap(),
                compute_fingerprint(&tmp.path().join(name)).unwrap()
            );
        }
        assert!(!snapshot.join("meta.json").exists());
    }

    #[test]
    fn snapshots_never_collide() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("template.html"), "v1").unwrap();
        let first = backup(tmp.path(), TRACKED).unwrap();
        let second = backup(tmp.path(), TRACKED).unwrap();
        assert_ne!(first, second);
        assert_eq!(list_snapshots(tmp.path()).unwrap().len(), 2);
    }

    #[test]
    fn snapshot_name_is_filesystem_safe() {
        let tmp = TempDir::new().unwrap();
        let snapshot = backup(tmp.path(), TRACKED).unwrap();
        let name = snapshot.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-')));
    }

    #[test]
    fn list_is_empty_without_backups() {
        let tmp = TempDir::new().unwrap();
        assert!(list_snapshots(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn bundle_backup_writes_all_tracked_files() {
        let tmp = TempDir::new().unwrap();
        let bundle = TemplateBundle {
            markup: "<h1>remote</h1>".to_string(),
            style: "h1{}".to_string(),
            metadata: "{}".to_string(),
        };
        let snapshot = backup_bundle(tmp.path(), &bundle).unwrap();
        assert_eq!(fs::read_to_string(snapshot.join("template.html")).unwrap(), "<h1>remote</h1>");
        assert_eq!(fs::read_to_string(snapshot.join("meta.json")).unwrap(), "{}");
    }
}
