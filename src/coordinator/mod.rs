//! Coordinator module
//!
//! Runs one batch search: spawns the worker pool, feeds it every query
//! followed by one sentinel per worker, waits for the queue to drain and
//! merges the per-worker accumulators.
//!
//! # Flow
//!
//! ```text
//! resolve W ─▶ spawn W workers ─▶ put queries ─▶ put W sentinels
//!                                                      │
//!     merge + sort ◀── join threads ◀── queue.join() ◀─┘
//! ```
//!
//! Workers run on scoped threads, so the database and the engine factory
//! are lent to them by reference and no `Arc` is needed. A failing or
//! panicking worker cancels the queue; every blocked `put`, `get` and
//! `join` then returns, and the run fails without a partial result.

use crate::engine::EngineFactory;
use crate::error::SearchError;
use crate::hits::aggregator::HitsAggregator;
use crate::hits::{SortKey, TopHits};
use crate::model::QueryModel;
use crate::queue::{CancelToken, WorkItem, WorkQueue, DEFAULT_POLL_INTERVAL};
use crate::sequence::SequenceDatabase;
use crate::stats::WorkerStats;
use crate::worker::{Worker, WorkerOutcome};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Scheduling parameters of a search run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Number of workers (0 = one per available CPU)
    pub workers: usize,

    /// Bound on queued items; unbounded when unset
    pub queue_capacity: Option<usize>,

    /// How often a waiting coordinator re-checks for cancellation
    pub poll_interval_ms: u64,

    /// Order of the merged hits
    pub sort_key: SortKey,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            sort_key: SortKey::Score,
        }
    }
}

impl CoordinatorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Result of a successful run
#[derive(Debug)]
pub struct SearchOutcome {
    /// Merged and sorted hits of every query
    pub hits: TopHits,

    /// Per-worker statistics, ordered by worker id
    pub workers: Vec<WorkerStats>,

    /// Number of queries submitted
    pub queries: usize,

    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl SearchOutcome {
    /// Statistics of all workers merged together
    pub fn total_stats(&self) -> crate::Result<WorkerStats> {
        crate::stats::total(&self.workers)
    }
}

/// Number of hardware threads available to the process
pub fn available_parallelism() -> usize {
    num_cpus::get()
}

/// Resolve a requested worker count
///
/// 0 means one worker per available CPU, and the result is never below 1.
pub fn resolve_workers(requested: usize, available: impl FnOnce() -> usize) -> usize {
    if requested > 0 {
        requested
    } else {
        available().max(1)
    }
}

/// Parallel batch search driver
pub struct Coordinator<F> {
    factory: F,
    config: CoordinatorConfig,
    parallelism: fn() -> usize,
    cancel: Option<CancelToken>,
}

impl<F: EngineFactory> Coordinator<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            config: CoordinatorConfig::default(),
            parallelism: available_parallelism,
            cancel: None,
        }
    }

    /// Replace every scheduling parameter at once, e.g. from the `[search]`
    /// section of a config file
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = Some(capacity);
        self
    }

    /// Replace the hardware parallelism probe used when `workers` is 0
    pub fn with_parallelism_probe(mut self, probe: fn() -> usize) -> Self {
        self.parallelism = probe;
        self
    }

    /// Share a cancellation token with the caller
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Number of workers a run will spawn
    pub fn worker_count(&self) -> usize {
        resolve_workers(self.config.workers, self.parallelism)
    }

    /// Search every query against `db`
    ///
    /// Spawns the worker pool, enqueues every query in iteration order and
    /// then one sentinel per worker, waits for the queue to drain and merges
    /// the per-worker accumulators. The merged hits are sorted by the
    /// configured key, so their order does not depend on the worker count.
    ///
    /// # Arguments
    ///
    /// * `queries` - Query models, searched in submission order
    /// * `db` - Target database, lent read-only to every worker
    ///
    /// # Returns
    ///
    /// The merged hits together with per-worker statistics and timing.
    ///
    /// # Errors
    ///
    /// - `WorkerFailed` / `WorkerInit` / `WorkerPanicked` for the lowest
    ///   worker id that failed; failures of other workers are logged
    /// - `Cancelled` if the cancel token fired before the queue drained
    /// - `Spawn` if a worker thread could not be started
    ///
    /// # Example
    ///
    /// ```
    /// use hmmpool::engine::mock::MockState;
    /// use hmmpool::model::QueryModel;
    /// use hmmpool::sequence::{Alphabet, Sequence, SequenceDatabase};
    /// use hmmpool::Coordinator;
    ///
    /// let db = SequenceDatabase::new(Alphabet::amino(), vec![Sequence::new("t", "MKVL")]);
    /// let queries = (0..4).map(|i| QueryModel::new(format!("q{}", i), Alphabet::amino(), "MK"));
    ///
    /// let state = MockState::new();
    /// let outcome = Coordinator::new(state.factory())
    ///     .with_workers(2)
    ///     .with_queue_capacity(2)
    ///     .run(queries, &db)?;
    ///
    /// assert_eq!(outcome.queries, 4);
    /// assert_eq!(outcome.workers.len(), 2);
    /// assert_eq!(state.total_calls(), 4);
    /// # Ok::<(), hmmpool::SearchError>(())
    /// ```
    pub fn run<I>(&self, queries: I, db: &SequenceDatabase) -> Result<SearchOutcome, SearchError>
    where
        I: IntoIterator<Item = QueryModel>,
    {
        let start = Instant::now();
        let workers = self.worker_count();
        let queue = self.build_queue();
        let alphabet = db.alphabet();

        tracing::info!(
            workers,
            targets = db.len(),
            alphabet = %alphabet,
            bounded = ?self.config.queue_capacity,
            "starting search"
        );

        let (results, submitted, interrupted) = std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            let mut spawn_error = None;

            for id in 0..workers {
                let queue = &queue;
                let factory = &self.factory;
                let spawned = std::thread::Builder::new()
                    .name(format!("hmmpool-worker-{}", id))
                    .spawn_scoped(scope, move || {
                        let _guard = CancelOnPanic(queue);
                        match Worker::new(id, db, queue, alphabet, factory) {
                            Ok(worker) => Ok(worker.run()),
                            Err(e) => {
                                queue.cancel();
                                Err(SearchError::WorkerInit {
                                    worker: id,
                                    source: Box::new(e),
                                })
                            }
                        }
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        spawn_error = Some(e);
                        break;
                    }
                }
            }

            if let Some(e) = spawn_error {
                queue.cancel();
                for handle in handles {
                    let _ = handle.join();
                }
                return Err(SearchError::Spawn(e));
            }

            let mut submitted = 0usize;
            let mut interrupted = false;
            for query in queries {
                if queue.put(WorkItem::Query(query)).is_err() {
                    interrupted = true;
                    break;
                }
                submitted += 1;
            }

            if !interrupted {
                for _ in 0..workers {
                    if queue.put(WorkItem::Sentinel).is_err() {
                        interrupted = true;
                        break;
                    }
                }
            }

            tracing::debug!(submitted, "queries enqueued, waiting for workers");
            // A cancel after the last get can still leave skipped items behind
            if queue.join().is_err() || queue.is_cancelled() {
                interrupted = true;
            }

            let results: Vec<Result<WorkerOutcome, SearchError>> = handles
                .into_iter()
                .enumerate()
                .map(|(id, handle)| {
                    handle
                        .join()
                        .unwrap_or(Err(SearchError::WorkerPanicked { worker: id }))
                })
                .collect();

            Ok((results, submitted, interrupted))
        })?;

        let mut aggregator = HitsAggregator::new().with_sort_key(self.config.sort_key);
        let mut stats = Vec::with_capacity(results.len());
        let mut first_error: Option<SearchError> = None;

        for result in results {
            let failure = match result {
                Ok(outcome) => {
                    stats.push(outcome.stats);
                    match outcome.error {
                        Some(e) => Some(e),
                        None => {
                            aggregator.add_worker(outcome.id, outcome.hits);
                            None
                        }
                    }
                }
                Err(e) => Some(e),
            };

            if let Some(e) = failure {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    tracing::warn!("additional worker failure: {}", e);
                }
            }
        }

        if let Some(e) = first_error {
            tracing::error!("search failed: {}", e);
            return Err(e);
        }
        if interrupted {
            tracing::warn!(submitted, "search cancelled");
            return Err(SearchError::Cancelled);
        }

        debug_assert_eq!(
            stats.iter().map(|s| s.queries_processed()).sum::<u64>(),
            submitted as u64
        );

        tracing::debug!(
            workers = aggregator.num_workers(),
            hits = aggregator.total_hits(),
            "merging worker results"
        );
        let hits = aggregator.aggregate();
        let elapsed = start.elapsed();
        tracing::info!(
            queries = submitted,
            hits = hits.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "search complete"
        );

        Ok(SearchOutcome {
            hits,
            workers: stats,
            queries: submitted,
            elapsed,
        })
    }

    fn build_queue(&self) -> WorkQueue<QueryModel> {
        let queue = match self.config.queue_capacity {
            Some(capacity) => WorkQueue::bounded(capacity),
            None => WorkQueue::new(),
        };
        let queue = queue.with_poll_interval(self.config.poll_interval());
        match &self.cancel {
            Some(token) => queue.with_cancel_token(token.clone()),
            None => queue,
        }
    }
}

/// Search every query against `db` with `workers` threads
///
/// Convenience wrapper around [`Coordinator::run`] with default settings.
///
/// # Arguments
///
/// * `queries` - Query models, searched in submission order
/// * `db` - Target database shared read-only by all workers
/// * `workers` - Number of worker threads; 0 means one per available CPU
/// * `factory` - Builds one private engine per worker
///
/// # Returns
///
/// The merged hits of all queries, sorted by score. Equal scores are
/// ordered by query name, target index and query submission index.
///
/// # Errors
///
/// The first worker failure, or `Cancelled`. No partial result is
/// returned.
///
/// # Example
///
/// ```
/// use hmmpool::engine::{EngineConfig, ungapped::UngappedEngine};
/// use hmmpool::model::QueryModel;
/// use hmmpool::sequence::{Alphabet, Sequence, SequenceDatabase};
/// use hmmpool::SearchError;
///
/// let db = SequenceDatabase::new(
///     Alphabet::dna(),
///     vec![Sequence::new("t1", "GGACGTACGTACGTGG"), Sequence::new("t2", "TTTTTTTT")],
/// );
/// let queries = vec![
///     QueryModel::new("q1", Alphabet::dna(), "ACGTACGTACGT"),
///     QueryModel::new("q2", Alphabet::dna(), "CCCCCC"),
/// ];
///
/// let factory = |alphabet| Ok::<_, SearchError>(UngappedEngine::new(alphabet, EngineConfig::default()));
/// let hits = hmmpool::search_all(queries, &db, 2, factory)?;
///
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits.hits()[0].target_name, "t1");
/// # Ok::<(), hmmpool::SearchError>(())
/// ```
pub fn search_all<I, F>(
    queries: I,
    db: &SequenceDatabase,
    workers: usize,
    factory: F,
) -> Result<TopHits, SearchError>
where
    I: IntoIterator<Item = QueryModel>,
    F: EngineFactory,
{
    Coordinator::new(factory)
        .with_workers(workers)
        .run(queries, db)
        .map(|outcome| outcome.hits)
}

/// Cancels the queue if the owning worker thread unwinds
struct CancelOnPanic<'q, T>(&'q WorkQueue<T>);

impl<T> Drop for CancelOnPanic<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.cancel();
        }
    }
}
