//! modelgen CLI binary

use anyhow::Context;
use clap::Parser;
use modelgen::cli::{map_error, Cli, RunContext};
use modelgen::config::ConfigLoader;
use modelgen::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli)?;
    init_logging(Some(&logging_config)).context("Failed to initialize logging")?;
    info!("modelgen starting");

    let context = match RunContext::new(cli.project.clone(), cli.config.clone()) {
        Ok(context) => context,
        Err(e) => {
            error!("Failed to open project: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(2);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output.text);
            if output.failed {
                process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

/// Logging settings from the configuration, overridden by CLI flags.
fn build_logging_config(cli: &Cli) -> anyhow::Result<LoggingConfig> {
    if !cli.verbose {
        return Ok(LoggingConfig {
            level: "off".to_string(),
            ..LoggingConfig::default()
        });
    }

    let loaded = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(&cli.project),
    };
    let mut config = loaded.map(|c| c.logging).unwrap_or_default();

    if let Some(level) = &cli.log_level {
        config.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.format = format.parse()?;
    }
    if let Some(output) = &cli.log_output {
        config.output = output.parse()?;
    }
    if let Some(file) = &cli.log_file {
        config.file = Some(file.clone());
    }
    Ok(config)
}
