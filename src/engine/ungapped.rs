//! Ungapped consensus engine
//!
//! Scores the model consensus against every target along all diagonals and
//! keeps the best-scoring ungapped segment (maximum subarray per diagonal).
//! It is a deliberately simple stand-in for a profile HMM pipeline: enough
//! to drive the scheduler end to end with real, deterministic scores.
//!
//! E-values are `Z * 2^-score`, with `Z` the effective database size.

use super::{check_alphabet, EngineConfig, SearchEngine};
use crate::error::SearchError;
use crate::hits::{Hit, TopHits};
use crate::model::QueryModel;
use crate::sequence::{Alphabet, SequenceDatabase};

#[derive(Debug, Clone)]
pub struct UngappedEngine {
    alphabet: Alphabet,
    config: EngineConfig,
    /// Searches run by this engine instance
    searches: u64,
}

impl UngappedEngine {
    pub fn new(alphabet: Alphabet, config: EngineConfig) -> Self {
        Self {
            alphabet,
            config,
            searches: 0,
        }
    }

    pub fn searches(&self) -> u64 {
        self.searches
    }

    /// Best ungapped local score of `query` against `target`
    pub fn best_diagonal_score(&self, query: &[u8], target: &[u8]) -> f64 {
        if query.is_empty() || target.is_empty() {
            return 0.0;
        }

        let mut best = 0.0f64;
        let diagonals = (query.len() + target.len() - 1) as isize;
        for d in 0..diagonals {
            // Diagonal d starts at (qi, ti) with qi - ti = query.len() - 1 - d
            let offset = query.len() as isize - 1 - d;
            let (mut qi, mut ti) = if offset >= 0 {
                (offset as usize, 0usize)
            } else {
                (0usize, (-offset) as usize)
            };

            let mut running = 0.0f64;
            while qi < query.len() && ti < target.len() {
                running += if query[qi] == target[ti] {
                    self.config.match_score
                } else {
                    self.config.mismatch_score
                };
                if running < 0.0 {
                    running = 0.0;
                }
                best = best.max(running);
                qi += 1;
                ti += 1;
            }
        }
        best
    }
}

impl SearchEngine for UngappedEngine {
    fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    fn search(
        &mut self,
        query: &QueryModel,
        db: &SequenceDatabase,
        hits: &mut TopHits,
    ) -> Result<(), SearchError> {
        check_alphabet(self.alphabet, query.alphabet)?;
        check_alphabet(self.alphabet, db.alphabet())?;

        if query.consensus.is_empty() {
            return Err(SearchError::engine_failure("UngappedEngine::search", 1));
        }

        let z = self.config.effective_z(db);
        for (seqidx, target) in db.iter().enumerate() {
            let score = self.best_diagonal_score(&query.consensus, &target.residues);
            if score < self.config.min_score {
                continue;
            }

            let evalue = z * (-score).exp2();
            if evalue > self.config.evalue {
                continue;
            }

            let mut hit = Hit::new(&query.name, &target.name, seqidx, score, evalue);
            hit.query_accession = query.accession.clone();
            hit.included = evalue <= self.config.inc_evalue;
            hits.push(hit);
        }

        hits.record_search(query.m(), db.len(), db.total_residues());
        self.searches += 1;
        Ok(())
    }

    fn new_accumulator(&self) -> TopHits {
        self.config.new_accumulator()
    }
}
