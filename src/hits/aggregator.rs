//! Per-worker hit aggregation
//!
//! Collects the accumulator of every worker and reduces them into one sorted
//! result.
//!
//! The reduction is a parallel tree reduction (rayon). This is only correct
//! because [`TopHits::combine`] is associative and commutative in content;
//! the final sort then fixes the order of the merged hits.
//!
//! # Example
//!
//! ```
//! use hmmpool::hits::{aggregator::HitsAggregator, Hit, TopHits};
//!
//! let mut worker0 = TopHits::new();
//! worker0.push(Hit::new("q1", "seqA", 0, 12.0, 0.5));
//!
//! let mut worker1 = TopHits::new();
//! worker1.push(Hit::new("q2", "seqB", 1, 30.0, 1e-6));
//!
//! let mut aggregator = HitsAggregator::new();
//! aggregator.add_worker(0, worker0);
//! aggregator.add_worker(1, worker1);
//!
//! let merged = aggregator.aggregate();
//! assert_eq!(merged.len(), 2);
//! assert_eq!(merged.hits()[0].query_name, "q2");
//! ```

use super::{SortKey, TopHits};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Hit aggregator for multiple workers
///
/// # Usage
///
/// 1. Create aggregator with `new()`
/// 2. Add each worker's hits with `add_worker()`
/// 3. Take the merged, sorted view with `aggregate()`
#[derive(Debug)]
pub struct HitsAggregator {
    /// Per-worker hits (worker_id → hits)
    workers: BTreeMap<usize, TopHits>,
    sort_key: SortKey,
}

impl HitsAggregator {
    pub fn new() -> Self {
        Self {
            workers: BTreeMap::new(),
            sort_key: SortKey::Score,
        }
    }

    /// Order applied to the aggregate
    pub fn with_sort_key(mut self, key: SortKey) -> Self {
        self.sort_key = key;
        self
    }

    /// Add the accumulator of a worker
    ///
    /// Adding the same worker twice merges the two accumulators.
    pub fn add_worker(&mut self, worker_id: usize, hits: TopHits) {
        match self.workers.remove(&worker_id) {
            Some(existing) => {
                self.workers.insert(worker_id, TopHits::combine(existing, hits));
            }
            None => {
                self.workers.insert(worker_id, hits);
            }
        }
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Total hits across workers, before merging
    pub fn total_hits(&self) -> usize {
        self.workers.values().map(TopHits::len).sum()
    }

    /// Merge every worker's hits into one sorted result
    pub fn aggregate(self) -> TopHits {
        let sort_key = self.sort_key;
        let parts: Vec<TopHits> = self.workers.into_values().collect();

        let mut merged = parts
            .into_par_iter()
            .reduce(TopHits::new, TopHits::combine);
        merged.sort(sort_key);
        merged
    }
}

impl Default for HitsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
