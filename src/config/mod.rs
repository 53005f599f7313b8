//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//!
//! A configuration file mirrors [`Config`]; every section and every key is
//! optional:
//!
//! ```toml
//! [search]
//! workers = 8
//! queue_capacity = 64
//! sort_key = "score"
//!
//! [engine]
//! min_score = 12.0
//! evalue = 1.0
//!
//! [output]
//! format = "json"
//! path = "hits.json"
//! ```

pub mod cli;
pub mod toml;
pub mod validator;

use crate::coordinator::CoordinatorConfig;
use crate::engine::EngineConfig;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: CoordinatorConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Report format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Text,
    /// Machine-readable JSON report
    Json,
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Report file; stdout when unset
    pub path: Option<PathBuf>,
    /// Include per-worker statistics in the report
    pub per_worker: bool,
    /// Only report this many top hits
    pub max_hits: Option<usize>,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(f, "  Search: {}", self.search)?;
        writeln!(f, "  Engine: {}", self.engine)?;
        writeln!(f, "  Output: {}", self.output)?;
        Ok(())
    }
}

impl fmt::Display for CoordinatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.workers == 0 {
            write!(f, "workers=auto")?;
        } else {
            write!(f, "workers={}", self.workers)?;
        }
        match self.queue_capacity {
            Some(capacity) => write!(f, ", queue=bounded({})", capacity)?,
            None => write!(f, ", queue=unbounded")?,
        }
        write!(f, ", sort={}", self.sort_key)
    }
}

impl fmt::Display for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min_score={}, evalue={}, inc_evalue={}",
            self.min_score, self.evalue, self.inc_evalue
        )?;
        if let Some(z) = self.z {
            write!(f, ", Z={}", z)?;
        }
        Ok(())
    }
}

impl fmt::Display for OutputConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "format={}", self.format)?;
        match &self.path {
            Some(path) => write!(f, ", path={}", path.display())?,
            None => write!(f, ", path=stdout")?,
        }
        if let Some(max) = self.max_hits {
            write!(f, ", max_hits={}", max)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_display() {
        let text = Config::default().to_string();
        assert!(text.contains("workers=auto"));
        assert!(text.contains("queue=unbounded"));
        assert!(text.contains("format=text, path=stdout"));
    }

    #[test]
    fn test_bounded_display() {
        let search = CoordinatorConfig {
            workers: 4,
            queue_capacity: Some(32),
            ..CoordinatorConfig::default()
        };
        assert_eq!(search.to_string(), "workers=4, queue=bounded(32), sort=key");
    }
}
