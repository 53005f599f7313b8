//! Search engine abstraction
//!
//! A search engine scores one query model against the sequence database and
//! appends the resulting hits to an accumulator. The scheduler treats this as
//! an opaque, CPU-bound, synchronous call.
//!
//! # Architecture
//!
//! Engines hold mutable scratch state, so each worker owns a private engine
//! built once by an [`EngineFactory`] and reuses it for every query it
//! processes. Engines are built on the worker thread that uses them and never
//! need to be `Sync`.
//!
//! # Engine Types
//!
//! - **Ungapped**: reference engine scoring the best ungapped diagonal of the
//!   model consensus against each target
//! - **Mock**: deterministic test double that records every call
//!
//! # Example
//!
//! ```
//! use hmmpool::engine::{EngineConfig, SearchEngine};
//! use hmmpool::engine::ungapped::UngappedEngine;
//! use hmmpool::hits::TopHits;
//! use hmmpool::model::QueryModel;
//! use hmmpool::sequence::{Alphabet, Sequence, SequenceDatabase};
//!
//! let db = SequenceDatabase::new(
//!     Alphabet::dna(),
//!     vec![Sequence::new("t1", "TTTTACGTACGTACGTTTTT")],
//! );
//! let query = QueryModel::new("q1", Alphabet::dna(), "ACGTACGTACGT");
//!
//! let mut engine = UngappedEngine::new(Alphabet::dna(), EngineConfig::default());
//! let mut hits = TopHits::new();
//! engine.search(&query, &db, &mut hits)?;
//!
//! assert_eq!(hits.len(), 1);
//! # Ok::<(), hmmpool::SearchError>(())
//! ```

pub mod mock;
pub mod ungapped;

use crate::error::SearchError;
use crate::hits::TopHits;
use crate::model::QueryModel;
use crate::sequence::{Alphabet, SequenceDatabase};
use serde::{Deserialize, Serialize};

/// Per-worker search state
///
/// # Errors
///
/// `search` must report failures instead of panicking. Hits pushed before a
/// failure stay in the accumulator, but the coordinator never returns an
/// accumulator from a failed run.
pub trait SearchEngine: Send {
    /// Alphabet this engine was built for
    fn alphabet(&self) -> Alphabet;

    /// Search one query against the whole database, appending hits
    fn search(
        &mut self,
        query: &QueryModel,
        db: &SequenceDatabase,
        hits: &mut TopHits,
    ) -> Result<(), SearchError>;

    /// Empty accumulator for a worker driving this engine
    fn new_accumulator(&self) -> TopHits {
        TopHits::new()
    }
}

/// Builds one engine per worker
///
/// Implemented for any `Fn(Alphabet) -> Result<E, SearchError>` closure, so
/// most callers never name this trait.
pub trait EngineFactory: Sync {
    type Engine: SearchEngine;

    fn create(&self, alphabet: Alphabet) -> Result<Self::Engine, SearchError>;
}

impl<F, E> EngineFactory for F
where
    F: Fn(Alphabet) -> Result<E, SearchError> + Sync,
    E: SearchEngine,
{
    type Engine = E;

    fn create(&self, alphabet: Alphabet) -> Result<E, SearchError> {
        self(alphabet)
    }
}

/// Reporting and scoring parameters shared by the bundled engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum bit score for a target to become a hit
    pub min_score: f64,

    /// Reporting E-value threshold
    pub evalue: f64,

    /// Inclusion E-value threshold
    pub inc_evalue: f64,

    /// Fixed effective database size; the database length is used otherwise
    pub z: Option<f64>,

    /// Score of an identical residue pair
    pub match_score: f64,

    /// Score of a differing residue pair
    pub mismatch_score: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_score: 10.0,
            evalue: 10.0,
            inc_evalue: 0.01,
            z: None,
            match_score: 2.0,
            mismatch_score: -1.0,
        }
    }
}

impl EngineConfig {
    /// Effective database size for a search against `db`
    pub fn effective_z(&self, db: &SequenceDatabase) -> f64 {
        self.z.unwrap_or(db.len() as f64)
    }

    /// Accumulator matching this configuration's `Z` policy
    pub fn new_accumulator(&self) -> TopHits {
        match self.z {
            Some(z) => TopHits::with_fixed_z(z),
            None => TopHits::new(),
        }
    }
}

/// Fail with `AlphabetMismatch` unless `found` equals `expected`
pub fn check_alphabet(expected: Alphabet, found: Alphabet) -> Result<(), SearchError> {
    if expected != found {
        return Err(SearchError::AlphabetMismatch { expected, found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Sequence;

    struct NullEngine(Alphabet);

    impl SearchEngine for NullEngine {
        fn alphabet(&self) -> Alphabet {
            self.0
        }

        fn search(
            &mut self,
            query: &QueryModel,
            db: &SequenceDatabase,
            hits: &mut TopHits,
        ) -> Result<(), SearchError> {
            hits.record_search(query.m(), db.len(), db.total_residues());
            Ok(())
        }
    }

    #[test]
    fn test_closure_is_a_factory() {
        let factory = |alphabet| Ok::<_, SearchError>(NullEngine(alphabet));
        let engine = factory.create(Alphabet::rna()).unwrap();
        assert_eq!(engine.alphabet(), Alphabet::rna());
    }

    #[test]
    fn test_check_alphabet() {
        assert!(check_alphabet(Alphabet::dna(), Alphabet::dna()).is_ok());
        let err = check_alphabet(Alphabet::dna(), Alphabet::amino()).unwrap_err();
        assert!(matches!(
            err,
            SearchError::AlphabetMismatch {
                expected: Alphabet::Dna,
                found: Alphabet::Amino
            }
        ));
    }

    #[test]
    fn test_effective_z() {
        let db = SequenceDatabase::new(Alphabet::dna(), vec![Sequence::new("a", "AC")]);
        let config = EngineConfig::default();
        assert_eq!(config.effective_z(&db), 1.0);

        let fixed = EngineConfig {
            z: Some(200.0),
            ..EngineConfig::default()
        };
        assert_eq!(fixed.effective_z(&db), 200.0);
        assert_eq!(fixed.new_accumulator().fixed_z(), Some(200.0));
    }

    #[test]
    fn test_engine_config_from_toml_uses_defaults() {
        let config: EngineConfig = ::toml::from_str("min_score = 5.5").unwrap();
        assert_eq!(config.min_score, 5.5);
        assert_eq!(config.evalue, 10.0);
        assert!(config.z.is_none());
    }
}
