//! Mock search engine for testing
//!
//! `MockEngine` produces deterministic hits without doing any real scoring
//! and records every call in state shared by all engines built from the same
//! [`MockState`]. Tests use it to check scheduling properties: that every
//! query is searched exactly once, how many engines were built, and how the
//! coordinator reacts to failures or panics on a given query.
//!
//! # Features
//!
//! - Per-query call counts across all workers
//! - Count of engines constructed (one per worker)
//! - Configurable failure or panic on a named query
//! - Optional artificial delay per search
//!
//! # Example
//!
//! ```
//! use hmmpool::engine::{EngineFactory, SearchEngine};
//! use hmmpool::engine::mock::MockState;
//! use hmmpool::hits::TopHits;
//! use hmmpool::model::QueryModel;
//! use hmmpool::sequence::{Alphabet, Sequence, SequenceDatabase};
//!
//! let state = MockState::new();
//! let factory = state.factory();
//!
//! let db = SequenceDatabase::new(Alphabet::amino(), vec![Sequence::new("t", "MKV")]);
//! let query = QueryModel::new("q1", Alphabet::amino(), "MK");
//!
//! let mut engine = factory.create(Alphabet::amino()).unwrap();
//! engine.search(&query, &db, &mut TopHits::new()).unwrap();
//!
//! assert_eq!(state.engines_created(), 1);
//! assert_eq!(state.calls_for("q1"), 1);
//! ```

use super::{check_alphabet, SearchEngine};
use crate::error::SearchError;
use crate::hits::{Hit, TopHits};
use crate::model::QueryModel;
use crate::sequence::{Alphabet, SequenceDatabase};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;

/// How a mock search should fail for a given query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Return `EngineFailure` with this status code
    Status(i32),
    /// Return an allocation failure
    Allocation,
    /// Panic inside `search`
    Panic,
}

/// Call records shared by every engine built from one state
#[derive(Debug, Clone, Default)]
pub struct MockState {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    engines_created: AtomicUsize,
    calls: Mutex<HashMap<String, usize>>,
    threads: Mutex<HashMap<String, ThreadId>>,
    failures: Mutex<HashMap<String, MockFailure>>,
    delay: Mutex<Option<Duration>>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make searches of `query` fail in the given way
    pub fn fail_on(&self, query: impl Into<String>, failure: MockFailure) {
        self.inner
            .failures
            .lock()
            .unwrap()
            .insert(query.into(), failure);
    }

    /// Sleep this long in every search
    pub fn set_delay(&self, delay: Duration) {
        *self.inner.delay.lock().unwrap() = Some(delay);
    }

    /// Factory building one `MockEngine` per call
    pub fn factory(&self) -> impl Fn(Alphabet) -> Result<MockEngine, SearchError> + Sync + '_ {
        move |alphabet| {
            self.inner.engines_created.fetch_add(1, Ordering::SeqCst);
            Ok(MockEngine {
                alphabet,
                state: self.clone(),
                searches: 0,
            })
        }
    }

    pub fn engines_created(&self) -> usize {
        self.inner.engines_created.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, query: &str) -> usize {
        self.inner
            .calls
            .lock()
            .unwrap()
            .get(query)
            .copied()
            .unwrap_or(0)
    }

    /// Snapshot of query name → number of searches
    pub fn calls(&self) -> HashMap<String, usize> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.inner.calls.lock().unwrap().values().sum()
    }

    /// Number of distinct threads that ran at least one search
    pub fn distinct_threads(&self) -> usize {
        let threads = self.inner.threads.lock().unwrap();
        threads.values().collect::<HashSet<&ThreadId>>().len()
    }
}

/// Deterministic test double for [`SearchEngine`]
///
/// For query `q` and target `i`, a hit is produced when
/// `(weight(q) + i) % 3 == 0`, with score `(weight(q) + i) % 50`, where
/// `weight` is the byte sum of the query name. Scores repeat across queries,
/// which exercises tie-breaking in the merge.
#[derive(Debug)]
pub struct MockEngine {
    alphabet: Alphabet,
    state: MockState,
    searches: u64,
}

impl MockEngine {
    pub fn searches(&self) -> u64 {
        self.searches
    }

    /// Hits the mock produces for a query, independent of any engine state
    pub fn expected_hits(query: &QueryModel, db: &SequenceDatabase) -> TopHits {
        let mut hits = TopHits::new();
        let weight: usize = query.name.bytes().map(usize::from).sum();
        for (seqidx, target) in db.iter().enumerate() {
            let key = weight + seqidx;
            if key % 3 == 0 {
                let score = (key % 50) as f64;
                hits.push(Hit::new(&query.name, &target.name, seqidx, score, 1.0 / (1.0 + score)));
            }
        }
        hits.record_search(query.m(), db.len(), db.total_residues());
        hits
    }
}

impl SearchEngine for MockEngine {
    fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    fn search(
        &mut self,
        query: &QueryModel,
        db: &SequenceDatabase,
        hits: &mut TopHits,
    ) -> Result<(), SearchError> {
        {
            let inner = &self.state.inner;
            *inner.calls.lock().unwrap().entry(query.name.clone()).or_insert(0) += 1;
            inner
                .threads
                .lock()
                .unwrap()
                .insert(query.name.clone(), std::thread::current().id());
        }

        check_alphabet(self.alphabet, query.alphabet)?;

        let delay = *self.state.inner.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let failure = self.state.inner.failures.lock().unwrap().get(&query.name).cloned();
        match failure {
            Some(MockFailure::Status(code)) => {
                return Err(SearchError::engine_failure("MockEngine::search", code));
            }
            Some(MockFailure::Allocation) => {
                return Err(SearchError::allocation_array("f32", 4, query.m()));
            }
            Some(MockFailure::Panic) => panic!("mock engine panicked on {}", query.name),
            None => {}
        }

        hits.merge(Self::expected_hits(query, db));
        self.searches += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineFactory;
    use crate::sequence::Sequence;

    fn db() -> SequenceDatabase {
        SequenceDatabase::new(
            Alphabet::amino(),
            (0..12).map(|i| Sequence::new(format!("t{}", i), "MKV")).collect(),
        )
    }

    #[test]
    fn test_records_calls() {
        let state = MockState::new();
        let factory = state.factory();
        let mut engine = factory.create(Alphabet::amino()).unwrap();
        let query = QueryModel::new("q", Alphabet::amino(), "MK");

        let mut hits = TopHits::new();
        engine.search(&query, &db(), &mut hits).unwrap();
        engine.search(&query, &db(), &mut hits).unwrap();

        assert_eq!(state.calls_for("q"), 2);
        assert_eq!(state.calls_for("other"), 0);
        assert_eq!(state.total_calls(), 2);
        assert_eq!(engine.searches(), 2);
        assert_eq!(hits.searched_models(), 2);
    }

    #[test]
    fn test_deterministic_hits() {
        let query = QueryModel::new("q", Alphabet::amino(), "MK");
        let a = MockEngine::expected_hits(&query, &db());
        let b = MockEngine::expected_hits(&query, &db());
        assert_eq!(a, b);
        // 12 targets, every third key is a hit
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_configured_failure() {
        let state = MockState::new();
        state.fail_on("bad", MockFailure::Status(7));
        let factory = state.factory();
        let mut engine = factory.create(Alphabet::amino()).unwrap();

        let err = engine
            .search(&QueryModel::new("bad", Alphabet::amino(), "M"), &db(), &mut TopHits::new())
            .unwrap_err();
        assert!(matches!(err, SearchError::EngineFailure { code: 7, .. }));
        // The failing call is still recorded
        assert_eq!(state.calls_for("bad"), 1);
    }

    #[test]
    fn test_allocation_failure() {
        let state = MockState::new();
        state.fail_on("big", MockFailure::Allocation);
        let mut engine = state.factory().create(Alphabet::amino()).unwrap();

        let err = engine
            .search(&QueryModel::new("big", Alphabet::amino(), "MKV"), &db(), &mut TopHits::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "Could not allocate 12 bytes for an array of 3 f32");
    }

    #[test]
    fn test_alphabet_mismatch() {
        let state = MockState::new();
        let mut engine = state.factory().create(Alphabet::dna()).unwrap();
        let err = engine
            .search(&QueryModel::new("q", Alphabet::amino(), "M"), &db(), &mut TopHits::new())
            .unwrap_err();
        assert!(matches!(err, SearchError::AlphabetMismatch { .. }));
    }

    #[test]
    fn test_engines_created() {
        let state = MockState::new();
        let factory = state.factory();
        for _ in 0..3 {
            factory.create(Alphabet::amino()).unwrap();
        }
        assert_eq!(state.engines_created(), 3);
    }
}
