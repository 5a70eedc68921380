//! CLI parse: clap types for modelgen. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// modelgen - generate Java sources from a domain model
#[derive(Parser)]
#[command(name = "modelgen")]
#[command(about = "Generate Java sources from policy, product, table and enum models")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root directory
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// Configuration file (replaces the layered lookup)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable logging (default: off)
    #[arg(long, short)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file, used with `--log-output file`
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the whole model, or only the named objects and their dependants
    Build {
        /// Qualified names of changed objects; makes the build incremental
        #[arg(long = "changed", value_name = "QUALIFIED_NAME")]
        changed: Vec<String>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Delete every derived artifact of the model
    Clean {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print the files generated for an object
    Locate {
        /// Qualified name, e.g. `motor.Contract` or `motor.Product@2024-01-01`
        name: String,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}
