//! SHA-256 content fingerprints.
//!
//! Fingerprints cover raw bytes. A missing file is the [`Fingerprint::Absent`]
//! sentinel, never an error; any other read failure is an error the caller
//! must handle.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};

/// Content hash of a file at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    /// Lowercase hex SHA-256 of the file's bytes.
    Digest(String),
    /// The file does not exist.
    Absent,
}

impl Fingerprint {
    pub fn digest(&self) -> Option<&str> {
        match self {
            Fingerprint::Digest(hex) => Some(hex),
            Fingerprint::Absent => None,
        }
    }

    /// Whether this fingerprint matches a stored hex digest.
    pub fn matches(&self, stored: &str) -> bool {
        self.digest() == Some(stored)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fingerprint::Digest(hex) => f.write_str(hex),
            Fingerprint::Absent => f.write_str("<absent>"),
        }
    }
}

/// Fingerprint in-memory content.
pub fn fingerprint_bytes(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint::Digest(hex::encode(hasher.finalize()))
}

/// Fingerprint the file at `path`.
pub fn compute_fingerprint(path: &Path) -> Result<Fingerprint, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(fingerprint_bytes(&bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Fingerprint::Absent),
        Err(err) => Err(io_err(path, err)),
    }
}
