//! Configuration
//!
//! Layered project configuration: built-in defaults, the user's global file,
//! the project's `modelgen.toml` and `config/{MODELGEN_ENV}.toml`, then
//! `MODELGEN__*` environment overrides. The resulting [`ModelgenConfig`] is
//! turned into a generation context once per build.

use crate::context::{FeatureFlags, LanguageVariant, NamingConvention};
use crate::datatype::ValueDatatypeDecl;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Project identity and directories, relative to the project root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    /// Prefix prepended to every model package
    #[serde(default)]
    pub base_package: String,
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("model")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "modelgen".to_string(),
            base_package: String::new(),
            model_dir: default_model_dir(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelgenConfig {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub naming: NamingConvention,

    #[serde(default)]
    pub features: FeatureFlags,

    #[serde(default)]
    pub variant: LanguageVariant,

    /// Project value datatypes, in addition to the builtin ones
    #[serde(default)]
    pub datatypes: Vec<ValueDatatypeDecl>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Project: {0}")]
    Project(String),

    #[error("Naming: {0}")]
    Naming(String),

    #[error("Datatype '{id}': {message}")]
    Datatype { id: String, message: String },

    #[error("Logging: {0}")]
    Logging(String),
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Dotted identifier list; empty is the default package.
fn is_package(s: &str) -> bool {
    s.is_empty() || s.split('.').all(is_identifier)
}

impl ModelgenConfig {
    /// Check the whole configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.project.name.trim().is_empty() {
            errors.push(ValidationError::Project("name cannot be empty".to_string()));
        }
        if !is_package(&self.project.base_package) {
            errors.push(ValidationError::Project(format!(
                "base_package '{}' is not a valid package name",
                self.project.base_package
            )));
        }
        if self.project.model_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Project("model_dir cannot be empty".to_string()));
        }
        if self.project.output_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Project("output_dir cannot be empty".to_string()));
        } else if self.project.output_dir == self.project.model_dir {
            errors.push(ValidationError::Project(
                "output_dir must differ from model_dir".to_string(),
            ));
        }

        if !self.naming.interface_prefix.is_empty() && !is_identifier(&self.naming.interface_prefix) {
            errors.push(ValidationError::Naming(format!(
                "interface_prefix '{}' is not an identifier",
                self.naming.interface_prefix
            )));
        }
        if !is_identifier(&self.naming.internal_package) {
            errors.push(ValidationError::Naming(format!(
                "internal_package '{}' is not an identifier",
                self.naming.internal_package
            )));
        }
        if !is_identifier(&self.naming.generation_suffix) {
            errors.push(ValidationError::Naming(format!(
                "generation_suffix '{}' is not an identifier",
                self.naming.generation_suffix
            )));
        }

        let mut seen = HashSet::new();
        for decl in &self.datatypes {
            if decl.id.trim().is_empty() {
                errors.push(ValidationError::Datatype {
                    id: decl.id.clone(),
                    message: "id cannot be empty".to_string(),
                });
            } else if !seen.insert(decl.id.as_str()) {
                errors.push(ValidationError::Datatype {
                    id: decl.id.clone(),
                    message: "declared more than once".to_string(),
                });
            }
            if decl.class_name.is_empty() || !is_package(&decl.class_name) {
                errors.push(ValidationError::Datatype {
                    id: decl.id.clone(),
                    message: format!("class_name '{}' is not a qualified class name", decl.class_name),
                });
            }
            if !is_identifier(&decl.value_of_method) {
                errors.push(ValidationError::Datatype {
                    id: decl.id.clone(),
                    message: format!("value_of_method '{}' is not an identifier", decl.value_of_method),
                });
            }
        }

        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];
        if !LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::Logging(format!(
                "unknown level '{}'",
                self.logging.level
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
