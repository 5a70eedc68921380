//! CLI output: error mapping from domain errors to the CLI surface.

use crate::error::ApiError;

/// Message printed for a failed command.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::ConfigError(message) => format!("configuration error: {}", message),
        other => other.to_string(),
    }
}
