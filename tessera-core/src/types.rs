//! Domain types for Tessera template bundles.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a collection of templates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(pub String);

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CollectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CollectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed identifier for a single template inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub String);

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ArtifactId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ArtifactId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Fully-qualified reference to one artifact: `(collection, artifact)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub collection: CollectionId,
    pub artifact: ArtifactId,
}

impl ArtifactRef {
    pub fn new(collection: impl Into<CollectionId>, artifact: impl Into<ArtifactId>) -> Self {
        Self {
            collection: collection.into(),
            artifact: artifact.into(),
        }
    }

    /// Build a reference from user input, rejecting ids that cannot be used
    /// as a single path segment.
    pub fn parse(collection: &str, artifact: &str) -> Result<Self, ConfigError> {
        check_id("collection", collection)?;
        check_id("artifact", artifact)?;
        Ok(Self::new(collection, artifact))
    }

    /// Re-check both ids. Anything built with [`ArtifactRef::new`] from
    /// untrusted input goes through this before it touches a path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_id("collection", &self.collection.0)?;
        check_id("artifact", &self.artifact.0)
    }
}

/// Ids become directory and file names, so each must be one plain segment.
pub fn check_id(kind: &'static str, id: &str) -> Result<(), ConfigError> {
    let reason = if id.is_empty() {
        "must not be empty"
    } else if id == "." || id == ".." {
        "must not be a relative path component"
    } else if id.contains(['/', '\\']) {
        "must not contain path separators"
    } else if id.starts_with('.') {
        "must not start with '.'"
    } else if id.chars().any(char::is_control) {
        "must not contain control characters"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidId {
        kind,
        id: id.to_string(),
        reason,
    })
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.artifact)
    }
}

// ---------------------------------------------------------------------------
// Tracked files
// ---------------------------------------------------------------------------

/// The fixed set of files every template bundle owns on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrackedFile {
    Markup,
    Style,
    Metadata,
}

impl TrackedFile {
    /// Declaration order. Reports and writes always follow this order.
    pub const ALL: [TrackedFile; 3] = [TrackedFile::Markup, TrackedFile::Style, TrackedFile::Metadata];

    /// Relative file name inside the artifact directory.
    pub fn file_name(self) -> &'static str {
        match self {
            TrackedFile::Markup => "template.html",
            TrackedFile::Style => "style.css",
            TrackedFile::Metadata => "meta.json",
        }
    }

    /// Relative names of every tracked file, in declaration order.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.file_name()).collect()
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.file_name() == name)
    }
}

impl fmt::Display for TrackedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

// ---------------------------------------------------------------------------
// Bundle content
// ---------------------------------------------------------------------------

/// Canonical content of one template: the only shape the reconciliation
/// engine ever sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateBundle {
    pub markup: String,
    pub style: String,
    pub metadata: String,
}

impl TemplateBundle {
    pub fn content(&self, file: TrackedFile) -> &str {
        match file {
            TrackedFile::Markup => &self.markup,
            TrackedFile::Style => &self.style,
            TrackedFile::Metadata => &self.metadata,
        }
    }

    /// `(file, content)` pairs in declaration order.
    pub fn files(&self) -> impl Iterator<Item = (TrackedFile, &str)> {
        TrackedFile::ALL.into_iter().map(move |f| (f, self.content(f)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
