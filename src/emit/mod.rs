//! Source Emitter
//!
//! Boundary to the low-level writers. Builders hand over finished artifacts;
//! the emitter decides whether anything on disk actually changes.

pub mod fs;
pub mod memory;

pub use fs::FsEmitter;
pub use memory::MemoryEmitter;

use crate::error::EmitError;
use crate::types::StableId;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One emitted output unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Path relative to the output root
    pub path: PathBuf,
    pub content: String,
    /// Fully regenerable, safe to delete
    pub derived: bool,
    pub builder: String,
    pub source: Option<StableId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteResult {
    Created,
    Updated,
    Unchanged,
}

impl std::fmt::Display for WriteResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WriteResult::Created => "created",
            WriteResult::Updated => "updated",
            WriteResult::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

/// Date suffix format of generation artifacts: `<stem>_<yyyymmdd>`
pub const GENERATION_SUFFIX_FORMAT: &str = "%Y%m%d";

/// Everything a deleted source object may have produced in one directory.
///
/// Without `generation_suffix` only the exact stem matches. With it only the
/// stem followed by `_` and a valid generation date matches; the bare stem is
/// another type's class (`ContractGen.java` is not a generation of `Contract`).
/// Names merely sharing the stem as a textual prefix (`ContractItem.java` for
/// `Contract`) never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPrefix {
    pub directory: PathBuf,
    pub stem: String,
    pub generation_suffix: bool,
}

impl ArtifactPrefix {
    pub fn exact(directory: impl Into<PathBuf>, stem: &str) -> Self {
        Self {
            directory: directory.into(),
            stem: stem.to_string(),
            generation_suffix: false,
        }
    }

    /// Dated generation classes `<stem>_<yyyymmdd>` only.
    pub fn generations_of(directory: impl Into<PathBuf>, stem: &str) -> Self {
        Self {
            directory: directory.into(),
            stem: stem.to_string(),
            generation_suffix: true,
        }
    }

    /// Check a path relative to the output root.
    pub fn matches(&self, path: &Path) -> bool {
        if path.parent().unwrap_or_else(|| Path::new("")) != self.directory {
            return false;
        }
        let file_stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem,
            None => return false,
        };
        if !self.generation_suffix {
            return file_stem == self.stem;
        }
        file_stem
            .strip_prefix(self.stem.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .map_or(false, is_generation_date)
    }
}

fn is_generation_date(suffix: &str) -> bool {
    suffix.len() == 8
        && suffix.bytes().all(|b| b.is_ascii_digit())
        && NaiveDate::parse_from_str(suffix, GENERATION_SUFFIX_FORMAT).is_ok()
}

/// Emitter interface consumed by the builders
pub trait SourceEmitter: Send + Sync {
    fn emit(&self, artifact: &Artifact) -> Result<WriteResult, EmitError>;

    /// Remove every artifact matching `prefix`; returns the removed paths.
    fn delete(&self, prefix: &ArtifactPrefix) -> Result<Vec<PathBuf>, EmitError>;
}

/// Reject absolute paths and parent components.
pub(crate) fn validate_relative(path: &Path) -> Result<(), EmitError> {
    use std::path::Component;
    let valid = !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if valid {
        Ok(())
    } else {
        Err(EmitError::InvalidPath(path.display().to_string()))
    }
}
