//! Biological alphabets
//!
//! An `Alphabet` identifies the symbol set shared by a search engine, the
//! sequence database, and every query model. Two alphabets are equal only if
//! they are the same variant; comparing across variants is how mismatches
//! are detected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbol set of a sequence or model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alphabet {
    /// Deoxyribonucleotides (ACGT)
    Dna,
    /// Ribonucleotides (ACGU)
    Rna,
    /// The 20 standard amino acids
    Amino,
}

impl Alphabet {
    pub fn dna() -> Self {
        Alphabet::Dna
    }

    pub fn rna() -> Self {
        Alphabet::Rna
    }

    pub fn amino() -> Self {
        Alphabet::Amino
    }

    /// Number of canonical symbols
    pub fn k(&self) -> usize {
        match self {
            Alphabet::Dna | Alphabet::Rna => 4,
            Alphabet::Amino => 20,
        }
    }

    /// Canonical symbols, uppercase
    pub fn symbols(&self) -> &'static [u8] {
        match self {
            Alphabet::Dna => b"ACGT",
            Alphabet::Rna => b"ACGU",
            Alphabet::Amino => b"ACDEFGHIKLMNPQRSTVWY",
        }
    }

    pub fn is_nucleotide(&self) -> bool {
        matches!(self, Alphabet::Dna | Alphabet::Rna)
    }

    pub fn is_dna(&self) -> bool {
        matches!(self, Alphabet::Dna)
    }

    pub fn is_rna(&self) -> bool {
        matches!(self, Alphabet::Rna)
    }

    pub fn is_amino(&self) -> bool {
        matches!(self, Alphabet::Amino)
    }

    /// Check whether a residue (case-insensitive) is a canonical symbol
    pub fn contains(&self, residue: u8) -> bool {
        self.symbols().contains(&residue.to_ascii_uppercase())
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alphabet::Dna => write!(f, "Alphabet::dna()"),
            Alphabet::Rna => write!(f, "Alphabet::rna()"),
            Alphabet::Amino => write!(f, "Alphabet::amino()"),
        }
    }
}
