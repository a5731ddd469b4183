//! Hash store: the per-artifact fingerprint baseline.
//!
//! Persists a flat JSON object (`relative file name → hex SHA-256`) at
//! `<artifact_dir>/.tessera/hashes.json`. Saves use the `.tmp` + rename
//! pattern and replace the whole document, so files that stopped being
//! tracked never linger.
//!
//! A store that exists but does not parse is reported as
//! [`StoreLoad::Corrupt`] rather than an error; callers treat it as "no
//! baseline" and surface a warning.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tessera_core::config::state_dir;

use crate::error::{io_err, SyncError};

/// In-memory fingerprint map: relative file name → hex digest.
pub type FingerprintMap = BTreeMap<String, String>;

pub const STORE_FILE: &str = "hashes.json";

/// Result of reading the baseline for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLoad {
    /// No store file yet.
    Missing,
    Loaded(FingerprintMap),
    /// The file exists but could not be read or parsed.
    Corrupt { reason: String },
}

impl StoreLoad {
    /// The usable baseline; empty for `Missing` and `Corrupt`.
    pub fn into_map(self) -> FingerprintMap {
        match self {
            StoreLoad::Loaded(map) => map,
            StoreLoad::Missing | StoreLoad::Corrupt { .. } => FingerprintMap::new(),
        }
    }

    pub fn warning(&self) -> Option<String> {
        match self {
            StoreLoad::Corrupt { reason } => {
                Some(format!("fingerprint store unreadable, treating as first pull: {reason}"))
            }
            _ => None,
        }
    }
}

/// `<artifact_dir>/.tessera/hashes.json`
pub fn store_path(artifact_dir: &Path) -> PathBuf {
    state_dir(artifact_dir).join(STORE_FILE)
}

/// Load the baseline for the artifact rooted at `artifact_dir`. Never fails.
pub fn load(artifact_dir: &Path) -> StoreLoad {
    let path = store_path(artifact_dir);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return StoreLoad::Missing,
        Err(err) => {
            return StoreLoad::Corrupt {
                reason: format!("{}: {err}", path.display()),
            }
        }
    };
    match serde_json::from_str::<FingerprintMap>(&contents) {
        Ok(map) => StoreLoad::Loaded(map),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "fingerprint store failed to parse");
            StoreLoad::Corrupt {
                reason: format!("{}: {err}", path.display()),
            }
        }
    }
}

/// Replace the baseline for `artifact_dir` atomically.
///
/// Only call this after the writes it describes have succeeded.
pub fn save(artifact_dir: &Path, map: &FingerprintMap) -> Result<(), SyncError> {
    let path = store_path(artifact_dir);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid hash store path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(map)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}
