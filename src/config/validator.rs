//! Configuration validation

use super::*;
use anyhow::{Context, Result};

/// Upper bound on the worker pool size
pub const MAX_WORKERS: usize = 4096;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_search(&config.search).context("Invalid [search] section")?;
    validate_engine(&config.engine).context("Invalid [engine] section")?;
    validate_output(&config.output).context("Invalid [output] section")?;
    Ok(())
}

/// Validate scheduling parameters
pub fn validate_search(search: &CoordinatorConfig) -> Result<()> {
    if search.workers > MAX_WORKERS {
        anyhow::bail!("workers must be at most {}, got {}", MAX_WORKERS, search.workers);
    }

    if search.queue_capacity == Some(0) {
        anyhow::bail!("queue_capacity must be at least 1");
    }

    if search.poll_interval_ms == 0 {
        anyhow::bail!("poll_interval_ms must be at least 1");
    }

    Ok(())
}

/// Validate scoring and reporting thresholds
pub fn validate_engine(engine: &EngineConfig) -> Result<()> {
    if !engine.min_score.is_finite() {
        anyhow::bail!("min_score must be finite, got {}", engine.min_score);
    }

    if !(engine.evalue > 0.0) {
        anyhow::bail!("evalue must be positive, got {}", engine.evalue);
    }

    if !(engine.inc_evalue > 0.0) {
        anyhow::bail!("inc_evalue must be positive, got {}", engine.inc_evalue);
    }

    if let Some(z) = engine.z {
        if !(z > 0.0) || !z.is_finite() {
            anyhow::bail!("Z must be a positive number, got {}", z);
        }
    }

    if !(engine.match_score > 0.0) {
        anyhow::bail!("match_score must be positive, got {}", engine.match_score);
    }

    if !(engine.mismatch_score <= 0.0) {
        anyhow::bail!(
            "mismatch_score must not be positive, got {}",
            engine.mismatch_score
        );
    }

    Ok(())
}

/// Validate report settings
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if output.max_hits == Some(0) {
        anyhow::bail!("max_hits must be at least 1");
    }

    if let Some(path) = &output.path {
        if path.is_dir() {
            anyhow::bail!("output path is a directory: {}", path.display());
        }
    }

    Ok(())
}
