//! Human-readable text output

use super::{format_duration_human, listed_hits};
use crate::config::Config;
use crate::coordinator::SearchOutcome;
use crate::stats::WorkerStats;
use crate::Result;
use std::io::Write;

const RULE: &str = "═══════════════════════════════════════════════════════════";

/// Write search results as text
///
/// Displays:
/// - Run summary (queries, targets searched, effective Z)
/// - Hit table, best first; `!` marks included hits, `?` reported-only
/// - Latency summary over all workers
/// - Per-worker breakdown (if enabled)
pub fn write_results<W: Write>(out: &mut W, outcome: &SearchOutcome, config: &Config) -> Result<()> {
    let hits = &outcome.hits;

    writeln!(out, "{}", RULE)?;
    writeln!(out, "                    SEARCH RESULTS")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out)?;

    writeln!(out, "Elapsed Time: {:.3}s", outcome.elapsed.as_secs_f64())?;
    writeln!(out, "Workers:      {}", outcome.workers.len())?;
    writeln!(out)?;

    writeln!(out, "Search space:")?;
    writeln!(out, "  Query models:  {}", format_number(hits.searched_models()))?;
    writeln!(out, "  Model nodes:   {}", format_number(hits.searched_nodes()))?;
    writeln!(out, "  Targets:       {}", format_number(hits.searched_sequences()))?;
    writeln!(out, "  Residues:      {}", format_number(hits.searched_residues()))?;
    writeln!(out, "  Z:             {}", hits.z())?;
    writeln!(out)?;

    let listed = listed_hits(outcome, config);
    writeln!(
        out,
        "Hits: {} ({} included)",
        format_number(hits.len() as u64),
        format_number(hits.included().count() as u64)
    )?;
    if listed.len() < hits.len() {
        writeln!(out, "  showing top {}", listed.len())?;
    }
    writeln!(out)?;

    if !listed.is_empty() {
        writeln!(
            out,
            "  {:>10} {:>7} {:>6}  {:<20} {:<20}",
            "E-value", "score", "bias", "query", "target"
        )?;
        writeln!(
            out,
            "  {:>10} {:>7} {:>6}  {:<20} {:<20}",
            "-------", "-----", "----", "-----", "------"
        )?;
        for hit in listed {
            let mark = if hit.included {
                '!'
            } else if hit.reported {
                '?'
            } else {
                ' '
            };
            writeln!(
                out,
                "{} {:>10.2e} {:>7.1} {:>6.1}  {:<20} {:<20}",
                mark, hit.evalue, hit.score, hit.bias, hit.query_name, hit.target_name
            )?;
        }
        writeln!(out)?;
    }

    let total = crate::stats::total(&outcome.workers)?;
    write_latency(out, &total)?;

    if config.output.per_worker {
        writeln!(out)?;
        writeln!(out, "Per-worker:")?;
        for stats in &outcome.workers {
            writeln!(
                out,
                "  worker {:>3}: {:>6} queries, {:>7} hits, busy {}",
                stats.worker_id(),
                format_number(stats.queries_processed()),
                format_number(stats.hits_found()),
                format_duration_human(stats.busy_time())
            )?;
        }
    }

    writeln!(out, "{}", RULE)?;
    Ok(())
}

fn write_latency<W: Write>(out: &mut W, stats: &WorkerStats) -> Result<()> {
    writeln!(out, "Query latency:")?;
    let hist = stats.latency();
    if hist.is_empty() {
        writeln!(out, "  (no queries searched)")?;
        return Ok(());
    }

    let show = |d: Option<std::time::Duration>| d.map(format_duration_human).unwrap_or_default();
    writeln!(out, "  Min:  {}", show(hist.min()))?;
    writeln!(out, "  Mean: {}", show(hist.mean()))?;
    writeln!(out, "  Max:  {}", show(hist.max()))?;
    for &p in &[50.0, 90.0, 99.0] {
        writeln!(out, "  p{:<3}: {}", p, show(hist.percentile(p)))?;
    }
    Ok(())
}

/// Format number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}
