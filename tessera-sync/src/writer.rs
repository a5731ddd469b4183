//! Atomic bundle writes and baseline re-stamping.
//!
//! ## `write_bundle` protocol
//!
//! 1. Content already fetched and reconciled by the caller.
//! 2. For each tracked file, compare the on-disk hash with the new content.
//! 3. Identical → leave the file alone (mtime preserved).
//! 4. Otherwise write `<path>.tessera.tmp`, then rename over the target.
//! 5. After every file succeeded, fingerprint the tracked files that exist
//!    and replace the hash store.
//!
//! A failure in step 4 returns before step 5, so the baseline never
//! describes content that was not written.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tessera_core::{ArtifactRef, TemplateBundle, TrackedFile};

use crate::error::{io_err, SyncError};
use crate::fingerprint::{compute_fingerprint, fingerprint_bytes};
use crate::hash_store::{self, FingerprintMap};

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File already had exactly this content.
    Unchanged { path: PathBuf },
}

/// Atomically replace `path` with `content`.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}.tessera.tmp", path.display()));
    atomic_write_with_tmp(path, content, &tmp)
}

fn atomic_write_with_tmp(path: &Path, content: &[u8], tmp: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent() {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Write every tracked file of `bundle` into `artifact_dir`, then re-stamp
/// the baseline.
pub fn write_bundle(artifact_dir: &Path, bundle: &TemplateBundle) -> Result<Vec<WriteResult>, SyncError> {
    let mut results = Vec::with_capacity(TrackedFile::ALL.len());
    for (file, content) in bundle.files() {
        let path = artifact_dir.join(file.file_name());
        let current = compute_fingerprint(&path)?;
        if current == fingerprint_bytes(content.as_bytes()) {
            tracing::debug!("unchanged: {}", path.display());
            results.push(WriteResult::Unchanged { path });
            continue;
        }
        atomic_write(&path, content.as_bytes())?;
        tracing::info!("wrote: {}", path.display());
        results.push(WriteResult::Written { path });
    }
    restamp(artifact_dir, &TrackedFile::names())?;
    Ok(results)
}

/// Fingerprint the tracked files that exist and replace the stored baseline.
pub fn restamp(artifact_dir: &Path, tracked: &[&str]) -> Result<FingerprintMap, SyncError> {
    let mut map = FingerprintMap::new();
    for name in tracked {
        if let Some(hex) = compute_fingerprint(&artifact_dir.join(name))?.digest() {
            map.insert((*name).to_string(), hex.to_string());
        }
    }
    hash_store::save(artifact_dir, &map)?;
    Ok(map)
}

/// True when at least one tracked file exists locally.
pub fn has_local_copy(artifact_dir: &Path) -> bool {
    TrackedFile::ALL
        .iter()
        .any(|f| artifact_dir.join(f.file_name()).exists())
}

/// Read the local bundle for publishing.
///
/// The markup file is required; a missing style or metadata file reads as
/// empty.
pub fn read_bundle(artifact_dir: &Path, artifact: &ArtifactRef) -> Result<TemplateBundle, SyncError> {
    let markup_path = artifact_dir.join(TrackedFile::Markup.file_name());
    let markup = match std::fs::read_to_string(&markup_path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(SyncError::MissingLocal {
                artifact: artifact.clone(),
            })
        }
        Err(err) => return Err(io_err(markup_path, err)),
    };
    Ok(TemplateBundle {
        markup,
        style: read_optional(&artifact_dir.join(TrackedFile::Style.file_name()))?,
        metadata: read_optional(&artifact_dir.join(TrackedFile::Metadata.file_name()))?,
    })
}

/// File content, or empty if absent.
pub fn read_optional(path: &Path) -> Result<String, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(io_err(path, err)),
    }
}
