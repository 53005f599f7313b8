//! Worker implementation
//!
//! A `Worker` is the execution unit that drains the shared work queue. Each
//! worker runs on its own thread and owns everything it mutates:
//!
//! - **SearchEngine**: built once at construction, reused for every query
//! - **TopHits**: the private accumulator every search appends to
//! - **WorkerStats**: per-query latency and counters
//!
//! The only things a worker shares are the read-only sequence database and
//! the queue itself.
//!
//! # Lifecycle
//!
//! ```text
//! wait for item ──query──▶ search ──done──▶ wait for item
//!       │
//!       └──sentinel / cancel / failure──▶ return outcome
//! ```
//!
//! Items are taken from the queue as [`Task`](crate::queue::Task) guards, so
//! every retrieved item is marked done exactly once whether the search
//! succeeds, fails, or panics. A panic inside the engine is caught and
//! reported like any other failure of that query. Hits are tagged with the
//! submission index of their query.
//!
//! # Example
//!
//! ```
//! use hmmpool::engine::mock::MockState;
//! use hmmpool::model::QueryModel;
//! use hmmpool::queue::{WorkItem, WorkQueue};
//! use hmmpool::sequence::{Alphabet, Sequence, SequenceDatabase};
//! use hmmpool::worker::Worker;
//!
//! let db = SequenceDatabase::new(Alphabet::amino(), vec![Sequence::new("t", "MKV")]);
//! let queue = WorkQueue::new();
//! queue.put(WorkItem::Query(QueryModel::new("q", Alphabet::amino(), "MK"))).unwrap();
//! queue.put(WorkItem::Sentinel).unwrap();
//!
//! let state = MockState::new();
//! let worker = Worker::new(0, &db, &queue, Alphabet::amino(), &state.factory())?;
//! let outcome = worker.run();
//!
//! assert!(outcome.error.is_none());
//! assert_eq!(outcome.stats.queries_processed(), 1);
//! assert_eq!(queue.pending(), 0);
//! # Ok::<(), hmmpool::SearchError>(())
//! ```

use crate::engine::{check_alphabet, EngineFactory, SearchEngine};
use crate::error::SearchError;
use crate::hits::TopHits;
use crate::model::QueryModel;
use crate::queue::{QueueError, WorkItem, WorkQueue};
use crate::sequence::{Alphabet, SequenceDatabase};
use crate::stats::WorkerStats;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Everything a worker hands back to the coordinator
#[derive(Debug)]
pub struct WorkerOutcome {
    pub id: usize,
    pub hits: TopHits,
    pub stats: WorkerStats,
    /// Failure captured while processing, if any
    pub error: Option<SearchError>,
}

impl WorkerOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Queue consumer owning a private engine and accumulator
pub struct Worker<'a, E: SearchEngine> {
    id: usize,
    db: &'a SequenceDatabase,
    queue: &'a WorkQueue<QueryModel>,
    engine: E,
    hits: TopHits,
    stats: WorkerStats,
}

impl<'a, E: SearchEngine> Worker<'a, E> {
    /// Build a worker and its engine
    ///
    /// # Errors
    ///
    /// Fails if the factory fails, or if the engine or the database do not
    /// use `alphabet`.
    pub fn new<F>(
        id: usize,
        db: &'a SequenceDatabase,
        queue: &'a WorkQueue<QueryModel>,
        alphabet: Alphabet,
        factory: &F,
    ) -> Result<Self, SearchError>
    where
        F: EngineFactory<Engine = E>,
    {
        let engine = factory.create(alphabet)?;
        check_alphabet(alphabet, engine.alphabet())?;
        check_alphabet(alphabet, db.alphabet())?;

        let hits = engine.new_accumulator();
        Ok(Self {
            id,
            db,
            queue,
            engine,
            hits,
            stats: WorkerStats::new(id),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Consume queue items until a sentinel, a cancellation, or a failure
    pub fn run(mut self) -> WorkerOutcome {
        let mut error = None;

        loop {
            let task = match self.queue.take() {
                Ok(task) => task,
                Err(QueueError::Cancelled) => {
                    tracing::debug!(worker = self.id, "queue cancelled, stopping");
                    break;
                }
                Err(e) => {
                    tracing::error!(worker = self.id, "queue error: {}", e);
                    break;
                }
            };

            let query = match task.item() {
                WorkItem::Sentinel => {
                    self.stats.record_sentinel();
                    break;
                }
                WorkItem::Query(query) => query,
            };

            if self.queue.is_cancelled() {
                tracing::debug!(worker = self.id, query = %query.name, "skipping query, search cancelled");
                self.stats.record_skipped();
                continue;
            }

            let start = Instant::now();
            let hits_before = self.hits.len();

            let result = panic::catch_unwind(AssertUnwindSafe(|| self.process(query)))
                .unwrap_or_else(|payload| {
                    Err(SearchError::EnginePanicked {
                        message: panic_message(payload.as_ref()),
                    })
                });

            match result {
                Ok(()) => {
                    self.hits.set_query_index(hits_before, task.index());
                    let elapsed = start.elapsed();
                    let found = self.hits.len().saturating_sub(hits_before);
                    self.stats.record_query(elapsed, found);
                    tracing::debug!(
                        worker = self.id,
                        query = %query.name,
                        hits = found,
                        elapsed_us = elapsed.as_micros() as u64,
                        "query searched"
                    );
                }
                Err(e) => {
                    self.stats.record_failure(start.elapsed());
                    tracing::warn!(worker = self.id, query = %query.name, "search failed: {}", e);
                    error = Some(SearchError::WorkerFailed {
                        worker: self.id,
                        query: query.name.clone(),
                        source: Box::new(e),
                    });
                    // Stop the other workers and release the coordinator's join
                    self.queue.cancel();
                    break;
                }
            }
        }

        WorkerOutcome {
            id: self.id,
            hits: self.hits,
            stats: self.stats,
            error,
        }
    }

    fn process(&mut self, query: &QueryModel) -> Result<(), SearchError> {
        check_alphabet(self.engine.alphabet(), query.alphabet)?;
        self.engine.search(query, self.db, &mut self.hits)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{MockEngine, MockFailure, MockState};
    use crate::sequence::Sequence;

    fn db() -> SequenceDatabase {
        SequenceDatabase::new(
            Alphabet::amino(),
            (0..9).map(|i| Sequence::new(format!("t{}", i), "MKVL")).collect(),
        )
    }

    fn query(name: &str) -> QueryModel {
        QueryModel::new(name, Alphabet::amino(), "MKV")
    }

    fn fill(queue: &WorkQueue<QueryModel>, names: &[&str], sentinels: usize) {
        for name in names {
            queue.put(WorkItem::Query(query(name))).unwrap();
        }
        for _ in 0..sentinels {
            queue.put(WorkItem::Sentinel).unwrap();
        }
    }

    #[test]
    fn test_new_worker_builds_one_engine() {
        let db = db();
        let queue = WorkQueue::new();
        let state = MockState::new();
        let worker = Worker::new(3, &db, &queue, Alphabet::amino(), &state.factory()).unwrap();

        assert_eq!(worker.id(), 3);
        assert_eq!(state.engines_created(), 1);
    }

    #[test]
    fn test_processes_until_sentinel() {
        let db = db();
        let queue = WorkQueue::new();
        fill(&queue, &["a", "b", "c"], 1);
        // Items after the sentinel belong to someone else
        queue.put(WorkItem::Query(query("d"))).unwrap();

        let state = MockState::new();
        let outcome = Worker::new(0, &db, &queue, Alphabet::amino(), &state.factory())
            .unwrap()
            .run();

        assert!(outcome.is_ok());
        assert_eq!(outcome.stats.queries_processed(), 3);
        assert_eq!(outcome.stats.sentinels(), 1);
        assert_eq!(outcome.hits.searched_models(), 3);
        assert_eq!(state.calls_for("d"), 0);
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn test_accumulates_expected_hits() {
        let db = db();
        let queue = WorkQueue::new();
        fill(&queue, &["a", "b"], 1);

        let state = MockState::new();
        let outcome = Worker::new(0, &db, &queue, Alphabet::amino(), &state.factory())
            .unwrap()
            .run();

        let mut expected = MockEngine::expected_hits(&query("a"), &db);
        let mut second = MockEngine::expected_hits(&query("b"), &db);
        second.set_query_index(0, 1);
        expected.merge(second);
        assert_eq!(outcome.hits, expected);
        assert_eq!(outcome.stats.hits_found(), expected.len() as u64);
    }

    #[test]
    fn test_failure_is_captured_and_marks_done() {
        let db = db();
        let queue = WorkQueue::new();
        fill(&queue, &["a", "bad", "c"], 1);

        let state = MockState::new();
        state.fail_on("bad", MockFailure::Status(3));
        let outcome = Worker::new(0, &db, &queue, Alphabet::amino(), &state.factory())
            .unwrap()
            .run();

        match &outcome.error {
            Some(SearchError::WorkerFailed { worker, query, .. }) => {
                assert_eq!(*worker, 0);
                assert_eq!(query, "bad");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(outcome.stats.queries_failed(), 1);
        // "a" and "bad" were marked done; "c" and the sentinel were never taken
        assert_eq!(queue.pending(), 2);
        assert!(queue.is_cancelled());
        assert_eq!(state.calls_for("c"), 0);
    }

    #[test]
    fn test_engine_panic_is_captured() {
        let db = db();
        let queue = WorkQueue::new();
        fill(&queue, &["a", "boom", "c"], 1);

        let state = MockState::new();
        state.fail_on("boom", MockFailure::Panic);
        let outcome = Worker::new(1, &db, &queue, Alphabet::amino(), &state.factory())
            .unwrap()
            .run();

        match &outcome.error {
            Some(SearchError::WorkerFailed { worker, query, source }) => {
                assert_eq!(*worker, 1);
                assert_eq!(query, "boom");
                match source.as_ref() {
                    SearchError::EnginePanicked { message } => {
                        assert_eq!(message, "mock engine panicked on boom");
                    }
                    other => panic!("unexpected source: {:?}", other),
                }
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(outcome.stats.queries_failed(), 1);
        assert!(queue.is_cancelled());
        // The panicking item was still marked done
        assert_eq!(queue.pending(), 2);
    }

    #[test]
    fn test_hits_carry_submission_index() {
        let db = db();
        let queue = WorkQueue::new();
        fill(&queue, &["same", "same", "same"], 1);

        let state = MockState::new();
        let outcome = Worker::new(0, &db, &queue, Alphabet::amino(), &state.factory())
            .unwrap()
            .run();

        let per_query = MockEngine::expected_hits(&query("same"), &db).len();
        assert!(per_query > 0);
        for index in 0..3 {
            let tagged = outcome.hits.iter().filter(|h| h.query_index == index).count();
            assert_eq!(tagged, per_query);
        }
        assert_eq!(outcome.hits.identities().len(), 3 * per_query);
    }

    #[test]
    fn test_query_alphabet_mismatch_is_captured() {
        let db = db();
        let queue = WorkQueue::new();
        queue
            .put(WorkItem::Query(QueryModel::new("dna", Alphabet::dna(), "ACGT")))
            .unwrap();
        queue.put(WorkItem::Sentinel).unwrap();

        let state = MockState::new();
        let outcome = Worker::new(0, &db, &queue, Alphabet::amino(), &state.factory())
            .unwrap()
            .run();

        let err = outcome.error.expect("mismatch should be captured");
        assert!(matches!(err.root_cause(), SearchError::AlphabetMismatch { .. }));
        // Rejected before the engine was called
        assert_eq!(state.calls_for("dna"), 0);
    }

    #[test]
    fn test_database_alphabet_mismatch_fails_construction() {
        let db = db();
        let queue = WorkQueue::new();
        let state = MockState::new();

        let result = Worker::new(0, &db, &queue, Alphabet::dna(), &state.factory());
        assert!(matches!(result, Err(SearchError::AlphabetMismatch { .. })));
    }

    #[test]
    fn test_skips_items_after_cancellation() {
        let db = db();
        let queue = WorkQueue::new();
        fill(&queue, &["a", "b"], 1);

        let state = MockState::new();
        let worker = Worker::new(0, &db, &queue, Alphabet::amino(), &state.factory()).unwrap();
        queue.cancel();
        let outcome = worker.run();

        assert!(outcome.is_ok());
        assert_eq!(outcome.stats.queries_processed(), 0);
        assert_eq!(state.total_calls(), 0);
    }

    #[test]
    fn test_workers_share_queue_without_duplication() {
        let db = db();
        let queue = WorkQueue::new();
        let names: Vec<String> = (0..40).map(|i| format!("q{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        fill(&queue, &refs, 3);

        let state = MockState::new();
        let factory = state.factory();
        let outcomes: Vec<WorkerOutcome> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..3)
                .map(|id| {
                    let (db, queue, factory) = (&db, &queue, &factory);
                    s.spawn(move || {
                        Worker::new(id, db, queue, Alphabet::amino(), factory)
                            .unwrap()
                            .run()
                    })
                })
                .collect();
            queue.join().unwrap();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let processed: u64 = outcomes.iter().map(|o| o.stats.queries_processed()).sum();
        assert_eq!(processed, 40);
        assert!(outcomes.iter().all(|o| o.stats.sentinels() == 1));
        assert!(names.iter().all(|n| state.calls_for(n) == 1));
    }
}
