//! CLI: clap definitions, the route table and report presentation.
//! The engine itself lives in the orchestrator; handlers stay thin.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::{format_build_report, format_locate_result};
pub use route::{CommandOutput, RunContext};
