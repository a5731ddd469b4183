//! Local drift detection against the fingerprint baseline.
//!
//! Classification per tracked file, in declaration order:
//! 1. no baseline at all (missing, empty or corrupt store) → every file `Unchanged`
//! 2. no baseline entry for this file → `Unchanged` (newly tracked)
//! 3. current fingerprint equals baseline → `Unchanged`
//! 4. file now absent → `Deleted`
//! 5. otherwise, including unreadable files → `Modified`
//!
//! Comparison is by content hash only; modification times are never read.
//!
//! [`classify_remote`] applies the same baseline to the remote's copy before
//! a push, with rule 2 inverted: a file the baseline has no entry for was
//! absent at the last sync, so remote content for it is new.

use std::fmt;
use std::path::Path;

use tessera_core::{TemplateBundle, TrackedFile};

use crate::fingerprint::{compute_fingerprint, fingerprint_bytes, Fingerprint};
use crate::hash_store::{self, FingerprintMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Unchanged,
    Modified,
    Deleted,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Unchanged => f.write_str("unchanged"),
            FileStatus::Modified => f.write_str("modified"),
            FileStatus::Deleted => f.write_str("deleted"),
        }
    }
}

/// What was observed for one file when the report was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Seen(Fingerprint),
    Unreadable(String),
    /// Not inspected (no baseline to compare against).
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub file: String,
    pub status: FileStatus,
    pub observed: Observation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineState {
    /// No usable baseline: nothing can conflict.
    FirstPull,
    Tracked,
}

/// Per-file classification for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReport {
    pub baseline: BaselineState,
    pub entries: Vec<FileChange>,
    pub warnings: Vec<String>,
}

impl ChangeReport {
    fn first_pull(tracked: &[&str], warnings: Vec<String>) -> Self {
        Self {
            baseline: BaselineState::FirstPull,
            entries: tracked
                .iter()
                .map(|name| FileChange {
                    file: (*name).to_string(),
                    status: FileStatus::Unchanged,
                    observed: Observation::Skipped,
                })
                .collect(),
            warnings,
        }
    }

    /// True when every entry is `Unchanged`.
    pub fn is_clean(&self) -> bool {
        self.entries.iter().all(|e| e.status == FileStatus::Unchanged)
    }

    /// Entries that are `Modified` or `Deleted`.
    pub fn changed(&self) -> impl Iterator<Item = &FileChange> {
        self.entries.iter().filter(|e| e.status != FileStatus::Unchanged)
    }

    pub fn status_of(&self, file: &str) -> Option<FileStatus> {
        self.entries.iter().find(|e| e.file == file).map(|e| e.status)
    }
}

/// Compare the files under `artifact_dir` with its stored baseline.
pub fn detect(artifact_dir: &Path, tracked: &[&str]) -> ChangeReport {
    let load = hash_store::load(artifact_dir);
    let warnings: Vec<String> = load.warning().into_iter().collect();
    let baseline = load.into_map();
    if baseline.is_empty() {
        return ChangeReport::first_pull(tracked, warnings);
    }

    classify(&baseline, observe(artifact_dir, tracked))
}

/// Current fingerprint of each tracked file, in `tracked` order.
///
/// Read failures become [`Observation::Unreadable`] instead of errors.
pub fn observe(artifact_dir: &Path, tracked: &[&str]) -> Vec<(String, Observation)> {
    tracked
        .iter()
        .map(|name| {
            let path = artifact_dir.join(name);
            let observed = match compute_fingerprint(&path) {
                Ok(fp) => Observation::Seen(fp),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "unreadable tracked file, assuming modified");
                    Observation::Unreadable(err.to_string())
                }
            };
            ((*name).to_string(), observed)
        })
        .collect()
}

/// Pure classification of observed fingerprints against a baseline.
pub fn classify(baseline: &FingerprintMap, current: Vec<(String, Observation)>) -> ChangeReport {
    if baseline.is_empty() {
        let names: Vec<&str> = current.iter().map(|(name, _)| name.as_str()).collect();
        return ChangeReport::first_pull(&names, Vec::new());
    }

    let mut warnings = Vec::new();
    let entries = current
        .into_iter()
        .map(|(file, observed)| {
            let status = match (baseline.get(&file), &observed) {
                (None, _) => FileStatus::Unchanged,
                (Some(stored), Observation::Seen(fp)) if fp.matches(stored) => FileStatus::Unchanged,
                (Some(_), Observation::Seen(Fingerprint::Absent)) => FileStatus::Deleted,
                (Some(_), Observation::Unreadable(reason)) => {
                    warnings.push(format!("{file}: {reason}"));
                    FileStatus::Modified
                }
                (Some(_), _) => FileStatus::Modified,
            };
            FileChange {
                file,
                status,
                observed,
            }
        })
        .collect();

    ChangeReport {
        baseline: BaselineState::Tracked,
        entries,
        warnings,
    }
}

/// Classify the remote's copy of an artifact against the local baseline.
///
/// - baseline entry, same content → `Unchanged`
/// - baseline entry, content now empty → `Deleted`
/// - baseline entry, other content → `Modified`
/// - no baseline entry, empty content → `Unchanged`
/// - no baseline entry, any content → `Modified`
///
/// `None` (the remote has no copy) leaves nothing to overwrite, so every
/// file is `Unchanged`.
pub fn classify_remote(baseline: &FingerprintMap, remote: Option<&TemplateBundle>) -> ChangeReport {
    let entries = TrackedFile::ALL
        .iter()
        .map(|file| {
            let name = file.file_name();
            let (status, observed) = match remote {
                None => (FileStatus::Unchanged, Fingerprint::Absent),
                Some(bundle) => {
                    let content = bundle.content(*file);
                    let fp = fingerprint_bytes(content.as_bytes());
                    let status = match baseline.get(name) {
                        Some(stored) if fp.matches(stored) => FileStatus::Unchanged,
                        Some(_) if content.is_empty() => FileStatus::Deleted,
                        Some(_) => FileStatus::Modified,
                        None if content.is_empty() => FileStatus::Unchanged,
                        None => FileStatus::Modified,
                    };
                    (status, fp)
                }
            };
            FileChange {
                file: name.to_string(),
                status,
                observed: Observation::Seen(observed),
            }
        })
        .collect();

    ChangeReport {
        baseline: if baseline.is_empty() {
            BaselineState::FirstPull
        } else {
            BaselineState::Tracked
        },
        entries,
        warnings: Vec::new(),
    }
}
