//! User-level config file: `$XDG_CONFIG_HOME/modelgen/config.toml` on Linux,
//! the platform config directory elsewhere.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::PathBuf;
use tracing::debug;

pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "modelgen").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Add the global file if it exists.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match global_config_path() {
        Some(path) if path.exists() => {
            debug!(config_path = %path.display(), "Using global configuration");
            Ok(builder.add_source(File::from(path).required(false)))
        }
        _ => Ok(builder),
    }
}
