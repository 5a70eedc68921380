//! Configuration loading entry point.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::ModelgenConfig;
use crate::error::ApiError;
use config::{ConfigError, Environment, File};
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the layered configuration of the project at `project_root`.
    pub fn load(project_root: &Path) -> Result<ModelgenConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, project_root)?;
        builder
            .add_source(
                Environment::with_prefix("MODELGEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load a single file on top of the defaults, ignoring other layers.
    pub fn load_from_file(path: &Path) -> Result<ModelgenConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    /// Load and validate, reporting every validation problem at once.
    pub fn load_validated(project_root: &Path) -> Result<ModelgenConfig, ApiError> {
        let config = Self::load(project_root)?;
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(config)
    }
}
