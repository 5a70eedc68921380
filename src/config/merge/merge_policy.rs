//! Built-in defaults, the lowest configuration layer.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder with every default set, so partial files deserialize.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("project.name", "modelgen")?
        .set_default("project.base_package", "")?
        .set_default("project.model_dir", "model")?
        .set_default("project.output_dir", "generated")?
        .set_default("variant", "java8")?
        .set_default("logging.level", "warn")
}
