//! Sequence database
//!
//! The database is the single resource shared by every worker during a
//! search. It is built once, never mutated afterwards, and lent to the
//! workers by shared reference, so no locking is required to read it.
//!
//! # Example
//!
//! ```
//! use hmmpool::sequence::{Alphabet, Sequence, SequenceDatabase};
//!
//! let db = SequenceDatabase::new(
//!     Alphabet::amino(),
//!     vec![
//!         Sequence::new("seq1", "MKVLAAGIVGLPNVGKS"),
//!         Sequence::new("seq2", "MSTNPKPQRKTKRNTNR"),
//!     ],
//! );
//!
//! assert_eq!(db.len(), 2);
//! assert_eq!(db.total_residues(), 34);
//! ```

pub mod alphabet;

pub use alphabet::Alphabet;

use serde::{Deserialize, Serialize};

/// A single target sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Residues as uppercase ASCII
    #[serde(with = "residue_string")]
    pub residues: Vec<u8>,
}

impl Sequence {
    /// Create a sequence from a name and a residue string
    ///
    /// Residues are normalized to uppercase.
    pub fn new(name: impl Into<String>, residues: impl AsRef<[u8]>) -> Self {
        Self {
            name: name.into(),
            description: None,
            residues: residues.as_ref().to_ascii_uppercase(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }
}

/// Immutable, ordered collection of target sequences
///
/// A sequence's position in the database is its `seqidx`, which hits carry
/// so that results from different workers can be ordered consistently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDatabase {
    alphabet: Alphabet,
    sequences: Vec<Sequence>,
}

impl SequenceDatabase {
    pub fn new(alphabet: Alphabet, sequences: Vec<Sequence>) -> Self {
        Self { alphabet, sequences }
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn get(&self, seqidx: usize) -> Option<&Sequence> {
        self.sequences.get(seqidx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sequence> {
        self.sequences.iter()
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Sum of all sequence lengths
    pub fn total_residues(&self) -> u64 {
        self.sequences.iter().map(|s| s.len() as u64).sum()
    }
}

/// Serialize residue bytes as a plain string so input files stay readable
pub(crate) mod residue_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(residues: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(residues))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(text.trim().as_bytes().to_ascii_uppercase())
    }
}

impl<'a> IntoIterator for &'a SequenceDatabase {
    type Item = &'a Sequence;
    type IntoIter = std::slice::Iter<'a, Sequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.sequences.iter()
    }
}
