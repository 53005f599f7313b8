//! CLI argument parsing using clap

use super::OutputFormat;
use crate::hits::SortKey;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::Level;

/// hmmpool - parallel batch homology search
///
/// Searches every query model against a sequence database on a pool of
/// worker threads and prints the merged hits.
#[derive(Parser, Debug)]
#[command(name = "hmmpool")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON file with the query models
    #[arg(value_name = "QUERIES")]
    pub queries: PathBuf,

    /// JSON file with the sequence database
    #[arg(value_name = "SEQDB")]
    pub seqdb: PathBuf,

    /// Number of worker threads (0 = one per CPU)
    #[arg(short = 'j', long, env = "HMMPOOL_JOBS")]
    pub jobs: Option<usize>,

    /// TOML configuration file (CLI options take precedence)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    // === Search Options ===
    /// Bound the work queue to this many items
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Minimum score for a target to be reported
    #[arg(long)]
    pub min_score: Option<f64>,

    /// Reporting E-value threshold
    #[arg(short = 'E', long)]
    pub evalue: Option<f64>,

    /// Effective database size used for E-values
    #[arg(short = 'Z', long)]
    pub z: Option<f64>,

    // === Output Options ===
    /// Report format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Order of reported hits: key (score) or seqidx
    #[arg(long)]
    pub sort: Option<SortKey>,

    /// Only report the N best hits
    #[arg(long, value_name = "N")]
    pub max_hits: Option<usize>,

    /// Include per-worker statistics
    #[arg(long)]
    pub per_worker: bool,

    /// Validate configuration and inputs without searching
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.queue_capacity == Some(0) {
            anyhow::bail!("queue_capacity must be at least 1");
        }

        if let Some(evalue) = self.evalue {
            if !(evalue > 0.0) {
                anyhow::bail!("evalue must be positive, got {}", evalue);
            }
        }

        if let Some(z) = self.z {
            if !(z > 0.0) {
                anyhow::bail!("Z must be positive, got {}", z);
            }
        }

        if self.max_hits == Some(0) {
            anyhow::bail!("max_hits must be at least 1");
        }

        Ok(())
    }

    /// Default log level for the subscriber
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
