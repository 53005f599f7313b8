//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Load the configuration file named on the command line, or the defaults
pub fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => Config::default(),
    };
    merge_cli_with_config(cli, config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Search settings
    if let Some(jobs) = cli.jobs {
        config.search.workers = jobs;
    }
    if let Some(capacity) = cli.queue_capacity {
        config.search.queue_capacity = Some(capacity);
    }
    if let Some(key) = cli.sort {
        config.search.sort_key = key;
    }

    // Engine thresholds
    if let Some(min_score) = cli.min_score {
        config.engine.min_score = min_score;
    }
    if let Some(evalue) = cli.evalue {
        config.engine.evalue = evalue;
    }
    if let Some(z) = cli.z {
        config.engine.z = Some(z);
    }

    // Output
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(path) = &cli.output {
        config.output.path = Some(path.clone());
    }
    if let Some(max) = cli.max_hits {
        config.output.max_hits = Some(max);
    }
    if cli.per_worker {
        config.output.per_worker = true;
    }

    Ok(config)
}
