//! JSON output formatting
//!
//! One document per run:
//! - Run metadata (tool version, timestamp, elapsed time, worker count)
//! - Search-space counters from the merged hits
//! - The hit list, in the configured sort order
//! - Latency totals and optional per-worker statistics

use super::{format_duration_human, listed_hits};
use crate::config::Config;
use crate::coordinator::SearchOutcome;
use crate::hits::{Hit, SortKey};
use crate::stats::StatsSummary;
use crate::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        let micros = d.as_micros() as u64;
        let human = format_duration_human(d);
        Self { micros, human }
    }
}

/// Counters describing what was searched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSummary {
    pub queries: usize,
    pub searched_models: u64,
    pub searched_nodes: u64,
    pub searched_sequences: u64,
    pub searched_residues: u64,
    #[serde(rename = "Z")]
    pub z: f64,
    pub hits: usize,
    pub reported: usize,
    pub included: usize,
}

/// Complete JSON report
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    /// RFC 3339 creation time
    pub timestamp: String,
    pub elapsed: JsonDuration,
    pub workers: usize,
    pub sort_key: SortKey,
    pub summary: JsonSummary,
    pub hits: &'a [Hit],
    pub totals: StatsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_worker: Option<Vec<StatsSummary>>,
}

/// Build the report for a finished search
pub fn build_report<'a>(outcome: &'a SearchOutcome, config: &Config) -> Result<JsonReport<'a>> {
    let hits = &outcome.hits;
    let totals = crate::stats::total(&outcome.workers)?.summary();

    let per_worker = config
        .output
        .per_worker
        .then(|| outcome.workers.iter().map(|s| s.summary()).collect());

    Ok(JsonReport {
        tool: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        elapsed: JsonDuration::from_duration(outcome.elapsed),
        workers: outcome.workers.len(),
        sort_key: config.search.sort_key,
        summary: JsonSummary {
            queries: outcome.queries,
            searched_models: hits.searched_models(),
            searched_nodes: hits.searched_nodes(),
            searched_sequences: hits.searched_sequences(),
            searched_residues: hits.searched_residues(),
            z: hits.z(),
            hits: hits.len(),
            reported: hits.reported().count(),
            included: hits.included().count(),
        },
        hits: listed_hits(outcome, config),
        totals,
        per_worker,
    })
}

/// Write a JSON report
pub fn write_json<W: Write>(out: &mut W, report: &JsonReport<'_>, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, report)?;
    } else {
        serde_json::to_writer(&mut *out, report)?;
    }
    writeln!(out)?;
    Ok(())
}
