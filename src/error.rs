//! Error types for the model-to-source generator.

use std::path::PathBuf;
use thiserror::Error;

/// Domain model store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Source object not found: {0}")]
    NotFound(String),

    #[error("Duplicate source object: {0}")]
    Duplicate(String),

    #[error("Invalid source document {path:?}: {message}")]
    InvalidDocument { path: PathBuf, message: String },

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generator model construction errors.
///
/// Cloneable because a failed construction is cached for the rest of the
/// cache scope and handed to every caller asking for the same key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Cyclic model: {}", path.join(" -> "))]
    Cyclic { path: Vec<String> },

    #[error("{qualified_name} is a {kind} and cannot be viewed as {requested}")]
    KindMismatch {
        qualified_name: String,
        kind: String,
        requested: String,
    },

    #[error("Source object not found: {0}")]
    SourceNotFound(String),

    #[error("Unknown supertype '{supertype}' of {qualified_name}")]
    UnknownSupertype {
        qualified_name: String,
        supertype: String,
    },

    #[error("Model store error: {0}")]
    Store(String),
}

impl From<StorageError> for ModelError {
    fn from(err: StorageError) -> Self {
        ModelError::Store(err.to_string())
    }
}

/// Source emitter errors
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact path: {0}")]
    InvalidPath(String),
}

/// Build pass errors
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Builder '{builder}' failed on {object}: {message}")]
    BuilderExecution {
        builder: String,
        object: String,
        message: String,
    },

    #[error("Builder lifecycle violated: {0}")]
    OrchestratorProtocol(String),

    #[error("Build cancelled")]
    Cancelled,

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Emit error: {0}")]
    Emit(#[from] EmitError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl BuildError {
    pub fn execution(builder: &str, object: &str, message: impl Into<String>) -> Self {
        BuildError::BuilderExecution {
            builder: builder.to_string(),
            object: object.to_string(),
            message: message.into(),
        }
    }
}

/// Top-level errors surfaced to the build-trigger layer
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Model error: {0}")]
    ModelError(#[from] ModelError),

    #[error("Build error: {0}")]
    BuildError(#[from] BuildError),

    #[error("Unknown source object: {0}. Check the model directory or run a full build.")]
    UnknownObject(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
