//! CLI route: run context and the single route table.

use crate::cli::parse::Commands;
use crate::cli::presentation::{format_build_report, format_locate_result};
use crate::config::{ConfigLoader, ModelgenConfig};
use crate::context::GenerationContext;
use crate::emit::FsEmitter;
use crate::error::{ApiError, BuildError};
use crate::orchestrator::{BuildKind, BuildRequest, Orchestrator};
use crate::source::{FileModelStore, ModelStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Text to print, and whether the command should exit non-zero
#[derive(Debug)]
pub struct CommandOutput {
    pub text: String,
    pub failed: bool,
}

/// Project, configuration and orchestrator for one CLI invocation.
pub struct RunContext {
    project_root: PathBuf,
    config: ModelgenConfig,
    store: Arc<FileModelStore>,
    orchestrator: Orchestrator,
}

impl RunContext {
    /// Load the configuration, the model directory and the output directory.
    pub fn new(project_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(&path)?,
            None => ConfigLoader::load(&project_root)?,
        };
        Self::with_config(project_root, config)
    }

    pub fn with_config(project_root: PathBuf, config: ModelgenConfig) -> Result<Self, ApiError> {
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;

        let store = Arc::new(FileModelStore::open(project_root.join(&config.project.model_dir))?);
        let emitter = FsEmitter::new(project_root.join(&config.project.output_dir))
            .map_err(BuildError::from)?;
        let orchestrator = Orchestrator::with_standard_builders(
            store.clone(),
            Arc::new(emitter),
            GenerationContext::from_config(&config),
        );
        info!(project = %config.project.name, root = %project_root.display(), "Project opened");

        Ok(Self {
            project_root,
            config,
            store,
            orchestrator,
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config(&self) -> &ModelgenConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, ApiError> {
        match command {
            Commands::Build { changed, format } => {
                let (request, kind) = if changed.is_empty() {
                    (BuildRequest::new(), BuildKind::Full)
                } else {
                    (BuildRequest::changed(self.resolve_names(changed)?), BuildKind::Incremental)
                };
                let report = self.orchestrator.run_build(&request, kind)?;
                Ok(CommandOutput {
                    text: format_build_report(&report, *format)?,
                    failed: report.is_failed(),
                })
            }
            Commands::Clean { format } => {
                let report = self.orchestrator.clean()?;
                Ok(CommandOutput {
                    text: format_build_report(&report, *format)?,
                    failed: report.is_failed(),
                })
            }
            Commands::Locate { name, format } => {
                let paths = self.orchestrator.locate(name)?;
                Ok(CommandOutput {
                    text: format_locate_result(name, &paths, *format)?,
                    failed: false,
                })
            }
        }
    }

    fn resolve_names(&self, names: &[String]) -> Result<Vec<crate::types::StableId>, ApiError> {
        names
            .iter()
            .map(|name| {
                self.store
                    .find(name)?
                    .map(|object| object.id())
                    .ok_or_else(|| ApiError::UnknownObject(name.clone()))
            })
            .collect()
    }
}
