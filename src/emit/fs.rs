//! Filesystem emitter: writes artifacts below an output root.

use crate::emit::{validate_relative, Artifact, ArtifactPrefix, SourceEmitter, WriteResult};
use crate::error::EmitError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

pub struct FsEmitter {
    root: PathBuf,
}

impl FsEmitter {
    /// Create an emitter rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, EmitError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| EmitError::Io {
            path: root.clone(),
            source,
        })?;
        let root = dunce::canonicalize(&root).map_err(|source| EmitError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> EmitError + '_ {
    move |source| EmitError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl SourceEmitter for FsEmitter {
    fn emit(&self, artifact: &Artifact) -> Result<WriteResult, EmitError> {
        validate_relative(&artifact.path)?;
        let target = self.root.join(&artifact.path);

        let result = match fs::read(&target) {
            Ok(existing) if existing == artifact.content.as_bytes() => {
                trace!(path = %artifact.path.display(), "Artifact unchanged");
                return Ok(WriteResult::Unchanged);
            }
            Ok(_) => WriteResult::Updated,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => WriteResult::Created,
            Err(e) => return Err(io_error(&target)(e)),
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        // temp file + rename so readers never see a half-written artifact
        let temp = target.with_extension("tmp");
        fs::write(&temp, artifact.content.as_bytes()).map_err(io_error(&temp))?;
        fs::rename(&temp, &target).map_err(|e| {
            let _ = fs::remove_file(&temp);
            io_error(&target)(e)
        })?;

        debug!(path = %artifact.path.display(), result = ?result, "Wrote artifact");
        Ok(result)
    }

    fn delete(&self, prefix: &ArtifactPrefix) -> Result<Vec<PathBuf>, EmitError> {
        validate_relative(&prefix.directory).or_else(|e| {
            if prefix.directory.as_os_str().is_empty() {
                Ok(())
            } else {
                Err(e)
            }
        })?;
        let dir = self.root.join(&prefix.directory);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir)(e)),
        };

        let mut deleted = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_error(&dir))?;
            if !entry.file_type().map_err(io_error(&dir))?.is_file() {
                continue;
            }
            let relative = prefix.directory.join(entry.file_name());
            if prefix.matches(&relative) {
                fs::remove_file(entry.path()).map_err(io_error(&entry.path()))?;
                deleted.push(relative);
            }
        }
        deleted.sort();
        debug!(
            directory = %prefix.directory.display(),
            stem = %prefix.stem,
            count = deleted.len(),
            "Deleted artifacts"
        );
        Ok(deleted)
    }
}
