//! Per-query search latency histogram
//!
//! Wraps HdrHistogram to track how long each query took to search against the
//! database. Query cost varies a lot with model length, so the histogram
//! spans 1 microsecond to 24 hours.
//!
//! # Example
//!
//! ```
//! use hmmpool::stats::histogram::LatencyHistogram;
//! use std::time::Duration;
//!
//! let mut hist = LatencyHistogram::new();
//! hist.record(Duration::from_millis(12));
//! hist.record(Duration::from_millis(40));
//!
//! assert_eq!(hist.len(), 2);
//! assert!(hist.percentile(50.0).is_some());
//! ```

use crate::Result;
use hdrhistogram::Histogram;
use std::time::Duration;

const MIN_MICROS: u64 = 1;
const MAX_MICROS: u64 = 24 * 3_600 * 1_000_000;

#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    /// Create an empty histogram with 3 significant digits of precision
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(MIN_MICROS, MAX_MICROS, 3)
            .expect("histogram bounds are valid constants");
        Self { histogram }
    }

    /// Record one sample, clamped into the tracked range
    #[inline]
    pub fn record(&mut self, latency: Duration) {
        let micros = (latency.as_micros() as u64).clamp(MIN_MICROS, MAX_MICROS);
        let _ = self.histogram.record(micros);
    }

    /// Value at a percentile (0.0 - 100.0), or None if empty
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(
            self.histogram.value_at_percentile(percentile),
        ))
    }

    pub fn min(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.min()))
    }

    pub fn max(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.max()))
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        Some(Duration::from_micros(self.histogram.mean() as u64))
    }

    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }

    /// Merge another histogram into this one
    pub fn merge(&mut self, other: &LatencyHistogram) -> Result<()> {
        self.histogram
            .add(&other.histogram)
            .map_err(|e| anyhow::anyhow!("Failed to merge latency histograms: {:?}", e))?;
        Ok(())
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}
