//! In-memory emitter for tests and dry runs.

use crate::emit::{validate_relative, Artifact, ArtifactPrefix, SourceEmitter, WriteResult};
use crate::error::EmitError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct MemoryEmitter {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file as if an earlier run or a user had written it.
    pub fn insert(&self, path: impl Into<PathBuf>, content: &str) {
        self.files.lock().insert(path.into(), content.to_string());
    }

    pub fn content(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().get(path.as_ref()).cloned()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files.lock().contains_key(path.as_ref())
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SourceEmitter for MemoryEmitter {
    fn emit(&self, artifact: &Artifact) -> Result<WriteResult, EmitError> {
        validate_relative(&artifact.path)?;
        let mut files = self.files.lock();
        let result = match files.get(&artifact.path) {
            Some(existing) if *existing == artifact.content => return Ok(WriteResult::Unchanged),
            Some(_) => WriteResult::Updated,
            None => WriteResult::Created,
        };
        files.insert(artifact.path.clone(), artifact.content.clone());
        Ok(result)
    }

    fn delete(&self, prefix: &ArtifactPrefix) -> Result<Vec<PathBuf>, EmitError> {
        let mut files = self.files.lock();
        let doomed: Vec<PathBuf> = files
            .keys()
            .filter(|path| prefix.matches(path))
            .cloned()
            .collect();
        for path in &doomed {
            files.remove(path);
        }
        Ok(doomed)
    }
}
