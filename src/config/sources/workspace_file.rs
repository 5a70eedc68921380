//! Project config files: `modelgen.toml` at the project root, then
//! `config/{MODELGEN_ENV}.toml`.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::Path;

pub const PROJECT_FILE: &str = "modelgen.toml";
pub const ENV_VAR: &str = "MODELGEN_ENV";

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    project_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = builder;

    let project_file = project_root.join(PROJECT_FILE);
    if project_file.exists() {
        builder = builder.add_source(File::from(project_file).required(false));
    }

    if let Ok(env_name) = std::env::var(ENV_VAR) {
        let env_file = project_root.join("config").join(format!("{}.toml", env_name));
        if env_file.exists() {
            builder = builder.add_source(File::from(env_file).required(false));
        }
    }

    Ok(builder)
}
