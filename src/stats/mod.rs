//! Worker statistics
//!
//! Every worker keeps its own `WorkerStats`; nothing here is shared between
//! threads while a search runs. The coordinator collects them afterwards and
//! can merge them into a run-wide summary.
//!
//! # Example
//!
//! ```
//! use hmmpool::stats::WorkerStats;
//! use std::time::Duration;
//!
//! let mut stats = WorkerStats::new(0);
//! stats.record_query(Duration::from_millis(5), 3);
//! stats.record_query(Duration::from_millis(8), 0);
//! stats.record_skipped();
//!
//! assert_eq!(stats.queries_processed(), 2);
//! assert_eq!(stats.hits_found(), 3);
//! assert_eq!(stats.queries_skipped(), 1);
//! ```

pub mod histogram;

use crate::Result;
use histogram::LatencyHistogram;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WorkerStats {
    worker_id: usize,
    queries_processed: u64,
    queries_skipped: u64,
    queries_failed: u64,
    hits_found: u64,
    sentinels: u64,
    busy_time: Duration,
    latency: LatencyHistogram,
}

impl WorkerStats {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            queries_processed: 0,
            queries_skipped: 0,
            queries_failed: 0,
            hits_found: 0,
            sentinels: 0,
            busy_time: Duration::ZERO,
            latency: LatencyHistogram::new(),
        }
    }

    /// Record one successfully searched query
    pub fn record_query(&mut self, elapsed: Duration, hits: usize) {
        self.queries_processed += 1;
        self.hits_found += hits as u64;
        self.busy_time += elapsed;
        self.latency.record(elapsed);
    }

    /// Record a query dropped because the run was cancelled
    pub fn record_skipped(&mut self) {
        self.queries_skipped += 1;
    }

    pub fn record_failure(&mut self, elapsed: Duration) {
        self.queries_failed += 1;
        self.busy_time += elapsed;
    }

    pub fn record_sentinel(&mut self) {
        self.sentinels += 1;
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn queries_processed(&self) -> u64 {
        self.queries_processed
    }

    pub fn queries_skipped(&self) -> u64 {
        self.queries_skipped
    }

    pub fn queries_failed(&self) -> u64 {
        self.queries_failed
    }

    pub fn hits_found(&self) -> u64 {
        self.hits_found
    }

    pub fn sentinels(&self) -> u64 {
        self.sentinels
    }

    pub fn busy_time(&self) -> Duration {
        self.busy_time
    }

    pub fn latency(&self) -> &LatencyHistogram {
        &self.latency
    }

    /// Fold another worker's statistics into this one
    pub fn merge(&mut self, other: &WorkerStats) -> Result<()> {
        self.queries_processed += other.queries_processed;
        self.queries_skipped += other.queries_skipped;
        self.queries_failed += other.queries_failed;
        self.hits_found += other.hits_found;
        self.sentinels += other.sentinels;
        self.busy_time += other.busy_time;
        self.latency.merge(&other.latency)?;
        Ok(())
    }

    pub fn summary(&self) -> StatsSummary {
        let micros = |d: Option<Duration>| d.map(|d| d.as_micros() as u64);
        StatsSummary {
            worker_id: self.worker_id,
            queries_processed: self.queries_processed,
            queries_skipped: self.queries_skipped,
            queries_failed: self.queries_failed,
            hits_found: self.hits_found,
            busy_time_us: self.busy_time.as_micros() as u64,
            latency_mean_us: micros(self.latency.mean()),
            latency_p50_us: micros(self.latency.percentile(50.0)),
            latency_p99_us: micros(self.latency.percentile(99.0)),
            latency_max_us: micros(self.latency.max()),
        }
    }
}

/// Serializable snapshot of a `WorkerStats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub worker_id: usize,
    pub queries_processed: u64,
    pub queries_skipped: u64,
    pub queries_failed: u64,
    pub hits_found: u64,
    pub busy_time_us: u64,
    pub latency_mean_us: Option<u64>,
    pub latency_p50_us: Option<u64>,
    pub latency_p99_us: Option<u64>,
    pub latency_max_us: Option<u64>,
}

/// Merge per-worker statistics into one run-wide total
pub fn total(stats: &[WorkerStats]) -> Result<WorkerStats> {
    let mut total = WorkerStats::new(0);
    for s in stats {
        total.merge(s)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats() {
        let stats = WorkerStats::new(4);
        assert_eq!(stats.worker_id(), 4);
        assert_eq!(stats.queries_processed(), 0);
        assert!(stats.latency().is_empty());
    }

    #[test]
    fn test_record_query() {
        let mut stats = WorkerStats::new(0);
        stats.record_query(Duration::from_millis(2), 5);
        stats.record_query(Duration::from_millis(3), 1);

        assert_eq!(stats.queries_processed(), 2);
        assert_eq!(stats.hits_found(), 6);
        assert_eq!(stats.busy_time(), Duration::from_millis(5));
        assert_eq!(stats.latency().len(), 2);
    }

    #[test]
    fn test_failure_and_sentinel() {
        let mut stats = WorkerStats::new(0);
        stats.record_failure(Duration::from_millis(1));
        stats.record_sentinel();
        assert_eq!(stats.queries_failed(), 1);
        assert_eq!(stats.sentinels(), 1);
        assert_eq!(stats.queries_processed(), 0);
    }

    #[test]
    fn test_merge() {
        let mut a = WorkerStats::new(0);
        a.record_query(Duration::from_millis(1), 2);
        a.record_sentinel();
        let mut b = WorkerStats::new(1);
        b.record_query(Duration::from_millis(4), 3);
        b.record_skipped();
        b.record_sentinel();

        let merged = total(&[a, b]).unwrap();
        assert_eq!(merged.queries_processed(), 2);
        assert_eq!(merged.queries_skipped(), 1);
        assert_eq!(merged.hits_found(), 5);
        assert_eq!(merged.sentinels(), 2);
        assert_eq!(merged.latency().len(), 2);
    }

    #[test]
    fn test_summary_empty_latency() {
        let summary = WorkerStats::new(2).summary();
        assert_eq!(summary.worker_id, 2);
        assert_eq!(summary.latency_p50_us, None);
    }
}
