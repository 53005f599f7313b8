//! Report output
//!
//! Renders a finished search as a text table or a JSON document, to stdout
//! or to the file named in the output configuration.

pub mod json;
pub mod text;

use crate::config::{Config, OutputFormat};
use crate::coordinator::SearchOutcome;
use crate::hits::Hit;
use crate::Result;
use anyhow::Context;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Duration;

/// Write the report for `outcome` in the configured format
pub fn write_report<W: Write>(out: &mut W, outcome: &SearchOutcome, config: &Config) -> Result<()> {
    match config.output.format {
        OutputFormat::Text => text::write_results(out, outcome, config),
        OutputFormat::Json => {
            let report = json::build_report(outcome, config)?;
            json::write_json(out, &report, true)
        }
    }
}

/// Write the report to the configured destination
pub fn emit(outcome: &SearchOutcome, config: &Config) -> Result<()> {
    match &config.output.path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            let mut out = BufWriter::new(file);
            write_report(&mut out, outcome, config)?;
            out.flush()
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_report(&mut out, outcome, config)?;
            out.flush()?;
        }
    }
    Ok(())
}

/// Hits to list in a report, honoring `max_hits`
pub(crate) fn listed_hits<'a>(outcome: &'a SearchOutcome, config: &Config) -> &'a [Hit] {
    let hits = outcome.hits.hits();
    match config.output.max_hits {
        Some(max) if max < hits.len() => &hits[..max],
        _ => hits,
    }
}

/// Format a duration with a unit fitting its magnitude
pub(crate) fn format_duration_human(d: Duration) -> String {
    let micros = d.as_micros() as u64;

    if micros == 0 {
        return "0µs".to_string();
    }

    if micros < 1000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.3}ms", micros as f64 / 1000.0)
    } else if micros < 60_000_000 {
        format!("{:.3}s", micros as f64 / 1_000_000.0)
    } else if micros < 3_600_000_000 {
        format!("{:.2}m", micros as f64 / 60_000_000.0)
    } else {
        format!("{:.2}h", micros as f64 / 3_600_000_000.0)
    }
}
