//! Search hits and the per-worker result accumulator
//!
//! Each worker owns one `TopHits` and appends to it as it processes queries.
//! At the end of a run the per-worker accumulators are combined into one.
//!
//! # Merge contract
//!
//! [`TopHits::combine`] is associative and commutative in content: the
//! result holds the union of both hit lists and the sum of both search
//! counters, whatever the order of combination. Hit order is not part of the
//! contract until [`TopHits::sort`] is called, which orders ties by hit
//! identity so that the sorted result does not depend on which worker found
//! what.
//!
//! # Example
//!
//! ```
//! use hmmpool::hits::{Hit, SortKey, TopHits};
//!
//! let mut a = TopHits::new();
//! a.push(Hit::new("q1", "seqA", 0, 42.0, 1e-9));
//!
//! let mut b = TopHits::new();
//! b.push(Hit::new("q2", "seqB", 1, 17.5, 1e-3));
//!
//! let mut merged = TopHits::combine(a, b);
//! merged.sort(SortKey::Score);
//!
//! assert_eq!(merged.len(), 2);
//! assert!(merged.is_sorted(SortKey::Score));
//! assert_eq!(merged.hits()[0].query_name, "q1");
//! ```

pub mod aggregator;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// One query/target match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub query_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_accession: Option<String>,
    /// Submission position of the query in its batch
    #[serde(default)]
    pub query_index: usize,
    pub target_name: String,
    /// Position of the target in the sequence database
    pub target_index: usize,
    /// Bit score
    pub score: f64,
    #[serde(default)]
    pub bias: f64,
    pub evalue: f64,
    /// Passes the reporting threshold
    #[serde(default = "default_true")]
    pub reported: bool,
    /// Passes the inclusion threshold
    #[serde(default)]
    pub included: bool,
}

fn default_true() -> bool {
    true
}

impl Hit {
    pub fn new(
        query_name: impl Into<String>,
        target_name: impl Into<String>,
        target_index: usize,
        score: f64,
        evalue: f64,
    ) -> Self {
        Self {
            query_name: query_name.into(),
            query_accession: None,
            query_index: 0,
            target_name: target_name.into(),
            target_index,
            score,
            bias: 0.0,
            evalue,
            reported: true,
            included: false,
        }
    }

    /// Identity of a hit, independent of its score and flags
    pub fn id(&self) -> HitId {
        HitId {
            query_name: self.query_name.clone(),
            query_index: self.query_index,
            target_index: self.target_index,
        }
    }

    fn cmp_by_key(&self, other: &Hit) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.query_name.cmp(&other.query_name))
            .then_with(|| self.target_index.cmp(&other.target_index))
            .then_with(|| self.query_index.cmp(&other.query_index))
    }

    fn cmp_by_seqidx(&self, other: &Hit) -> Ordering {
        self.target_index
            .cmp(&other.target_index)
            .then_with(|| self.query_name.cmp(&other.query_name))
            .then_with(|| other.score.total_cmp(&self.score))
            .then_with(|| self.query_index.cmp(&other.query_index))
    }
}

/// Identity of a hit within one batch
///
/// Query names need not be unique, so the submission index of the query is
/// part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HitId {
    pub query_name: String,
    pub query_index: usize,
    pub target_index: usize,
}

/// Ordering applied by [`TopHits::sort`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Score descending; ties broken by query name, target index, then
    /// query submission index
    #[serde(alias = "key")]
    Score,
    /// Target index ascending
    SeqIdx,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "key" | "score" => Ok(SortKey::Score),
            "seqidx" => Ok(SortKey::SeqIdx),
            other => Err(format!("invalid sort key: {:?}", other)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Score => write!(f, "key"),
            SortKey::SeqIdx => write!(f, "seqidx"),
        }
    }
}

/// Accumulated hits plus counters describing the searches that produced them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopHits {
    hits: Vec<Hit>,
    searched_models: u64,
    searched_nodes: u64,
    searched_sequences: u64,
    searched_residues: u64,
    /// Effective number of targets, summed over searches unless fixed
    z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fixed_z: Option<f64>,
}

impl TopHits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator whose `Z` is pinned instead of summed
    pub fn with_fixed_z(z: f64) -> Self {
        Self {
            z,
            fixed_z: Some(z),
            ..Self::default()
        }
    }

    pub fn push(&mut self, hit: Hit) {
        self.hits.push(hit);
    }

    /// Tag every hit from position `from` onward with a query submission index
    pub fn set_query_index(&mut self, from: usize, index: usize) {
        for hit in self.hits.iter_mut().skip(from) {
            hit.query_index = index;
        }
    }

    /// Account for one query searched against a database
    pub fn record_search(&mut self, nodes: usize, sequences: usize, residues: u64) {
        self.searched_models += 1;
        self.searched_nodes += nodes as u64;
        self.searched_sequences += sequences as u64;
        self.searched_residues += residues;
        if self.fixed_z.is_none() {
            self.z += sequences as f64;
        }
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn get(&self, index: usize) -> Option<&Hit> {
        self.hits.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hit> {
        self.hits.iter()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn searched_models(&self) -> u64 {
        self.searched_models
    }

    pub fn searched_nodes(&self) -> u64 {
        self.searched_nodes
    }

    pub fn searched_sequences(&self) -> u64 {
        self.searched_sequences
    }

    pub fn searched_residues(&self) -> u64 {
        self.searched_residues
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn fixed_z(&self) -> Option<f64> {
        self.fixed_z
    }

    /// Hits passing the reporting threshold
    pub fn reported(&self) -> impl Iterator<Item = &Hit> {
        self.hits.iter().filter(|h| h.reported)
    }

    /// Hits passing the inclusion threshold
    pub fn included(&self) -> impl Iterator<Item = &Hit> {
        self.hits.iter().filter(|h| h.included)
    }

    /// Set of hit identities, for order-insensitive comparison
    pub fn identities(&self) -> BTreeSet<HitId> {
        self.hits.iter().map(Hit::id).collect()
    }

    /// Move all hits and counters of `other` into `self`
    pub fn merge(&mut self, other: TopHits) {
        self.hits.extend(other.hits);
        self.searched_models += other.searched_models;
        self.searched_nodes += other.searched_nodes;
        self.searched_sequences += other.searched_sequences;
        self.searched_residues += other.searched_residues;

        match (self.fixed_z, other.fixed_z) {
            (Some(_), _) => {}
            (None, Some(z)) => {
                self.fixed_z = Some(z);
                self.z = z;
            }
            (None, None) => self.z += other.z,
        }
    }

    /// Combine two partial results into one
    ///
    /// The hit lists are concatenated and the search counters summed. A
    /// fixed `Z` on either side wins over a summed one.
    ///
    /// # Arguments
    ///
    /// * `a` - First partial result; its allocation is reused
    /// * `b` - Second partial result
    ///
    /// # Returns
    ///
    /// The union of both results. Content is the same whichever order the
    /// arguments come in; call [`TopHits::sort`] to fix the hit order.
    ///
    /// # Example
    ///
    /// ```
    /// use hmmpool::hits::{Hit, TopHits};
    ///
    /// let mut a = TopHits::new();
    /// a.push(Hit::new("q1", "seqA", 0, 42.0, 1e-9));
    /// a.record_search(10, 100, 5000);
    ///
    /// let mut b = TopHits::new();
    /// b.record_search(10, 100, 5000);
    ///
    /// let merged = TopHits::combine(a, b);
    /// assert_eq!(merged.len(), 1);
    /// assert_eq!(merged.searched_models(), 2);
    /// assert_eq!(merged.z(), 200.0);
    /// ```
    pub fn combine(mut a: TopHits, b: TopHits) -> TopHits {
        a.merge(b);
        a
    }

    /// Combine any number of partial results
    pub fn merge_all(parts: impl IntoIterator<Item = TopHits>) -> TopHits {
        parts.into_iter().fold(TopHits::new(), TopHits::combine)
    }

    /// Sort hits in place; ties are broken by hit identity
    pub fn sort(&mut self, key: SortKey) {
        match key {
            SortKey::Score => self.hits.sort_by(Hit::cmp_by_key),
            SortKey::SeqIdx => self.hits.sort_by(Hit::cmp_by_seqidx),
        }
    }

    pub fn is_sorted(&self, key: SortKey) -> bool {
        let cmp: fn(&Hit, &Hit) -> Ordering = match key {
            SortKey::Score => Hit::cmp_by_key,
            SortKey::SeqIdx => Hit::cmp_by_seqidx,
        };
        self.hits
            .windows(2)
            .all(|pair| cmp(&pair[0], &pair[1]) != Ordering::Greater)
    }
}

impl<'a> IntoIterator for &'a TopHits {
    type Item = &'a Hit;
    type IntoIter = std::slice::Iter<'a, Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

impl IntoIterator for TopHits {
    type Item = Hit;
    type IntoIter = std::vec::IntoIter<Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}
